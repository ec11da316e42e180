//! Run suffix naming
//!
//! Every created resource is named `<logical>` or `<logical>_<suffix>`.

/// Per-run suffix isolating one environment's resources from another's
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suffix(Option<String>);

impl Suffix {
    /// An empty suffix is the same as no suffix
    pub fn new(suffix: Option<impl Into<String>>) -> Self {
        Self(suffix.map(Into::into).filter(|s| !s.is_empty()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// External name for a logical name
    pub fn apply(&self, base: &str) -> String {
        match &self.0 {
            Some(suffix) => format!("{}_{}", base, suffix),
            None => base.to_string(),
        }
    }

    /// The trailing marker every suffixed name ends with (`"_<suffix>"`, or empty)
    pub fn marker(&self) -> String {
        self.apply("")
    }

    /// Recover the logical name, or `None` if `name` does not carry this suffix
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        match &self.0 {
            Some(_) => name.strip_suffix(self.marker().as_str()),
            None => Some(name),
        }
    }
}
