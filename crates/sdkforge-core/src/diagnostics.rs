use serde::Serialize;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A `format` with no dedicated builtin; the base type is used instead.
    FormatFallback,
    /// A `default` that does not fit the schema kind; it is dropped.
    DefaultMismatch,
    /// A union without a discriminator; decoded permissively.
    UndiscriminatedUnion,
    /// A security scheme the client cannot apply.
    UnsupportedSecurityScheme,
    /// A path placeholder with no declared parameter; a string one is synthesized.
    UndeclaredPathParameter,
    /// A keyword that was ignored or degraded.
    IgnoredConstruct,
}

/// A recoverable problem, reported but not fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub path: String,
    pub message: String,
}

/// Collects warnings across pipeline stages in the order they are raised.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: WarningKind, path: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            kind,
            path: path.into(),
            message: message.into(),
        };
        log::warn!("{}: {}", warning.path, warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
