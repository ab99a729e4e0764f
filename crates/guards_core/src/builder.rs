//! Builder pattern for creating declaration sources.
//!
//! Scanners and tests describe guarded sites with a fluent API instead of
//! filling `DeclarationSource` by hand.

use crate::{ArgValue, DeclarationSite, DeclarationSource, GuardArgs, ValueType};

/// Builder for creating a `DeclarationSource`.
///
/// # Example
///
/// ```rust
/// use guards_core::{DeclarationBuilder, PrimitiveType, ValueType};
///
/// let source = DeclarationBuilder::new("Range", ValueType::Primitive(PrimitiveType::Int32))
///     .parameter("Thermostat::set", 0)
///     .arg("min", 0)
///     .arg("max", 10)
///     .build();
///
/// assert_eq!(source.site.to_string(), "Thermostat::set#0");
/// ```
#[derive(Debug)]
pub struct DeclarationBuilder {
    kind: String,
    static_type: ValueType,
    site: Option<DeclarationSite>,
    args: GuardArgs,
}

impl DeclarationBuilder {
    /// Creates a new declaration builder.
    ///
    /// # Arguments
    ///
    /// * `kind` - Guard kind identifier (native or alias)
    /// * `static_type` - Declared type of the guarded value
    pub fn new(kind: impl Into<String>, static_type: ValueType) -> Self {
        Self {
            kind: kind.into(),
            static_type,
            site: None,
            args: GuardArgs::new(),
        }
    }

    /// Guards parameter `index` of `function`.
    pub fn parameter(mut self, function: impl Into<String>, index: usize) -> Self {
        self.site = Some(DeclarationSite::parameter(function, index));
        self
    }

    /// Guards the return value of `function`.
    pub fn returns(mut self, function: impl Into<String>) -> Self {
        self.site = Some(DeclarationSite::return_value(function));
        self
    }

    /// Sets the site directly.
    pub fn site(mut self, site: DeclarationSite) -> Self {
        self.site = Some(site);
        self
    }

    /// Adds a guard argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args = self.args.with(name, value);
        self
    }

    /// Builds the declaration source.
    ///
    /// # Panics
    ///
    /// Panics if no site was set.
    pub fn build(self) -> DeclarationSource {
        DeclarationSource {
            kind: self.kind,
            site: self.site.expect("site is required"),
            static_type: self.static_type,
            args: self.args,
        }
    }
}
