#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationLevel {
    /// Rules that only look at the call-site description itself.
    Structural,
    /// Structural rules plus pointcut and SPI resolution.
    Standard,
    /// Everything, including type compatibility of bound parameters.
    Full,
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub level: VerificationLevel,
    /// `0` means unlimited.
    pub max_diagnostics: usize,
    pub resolve_pointcuts: bool,
    pub check_spi: bool,
    pub check_compatibility: bool,
}

impl VerifierConfig {
    pub fn for_level(level: VerificationLevel) -> Self {
        match level {
            VerificationLevel::Structural => Self {
                level,
                max_diagnostics: 200,
                resolve_pointcuts: false,
                check_spi: false,
                check_compatibility: false,
            },
            VerificationLevel::Standard => Self {
                level,
                max_diagnostics: 200,
                resolve_pointcuts: true,
                check_spi: true,
                check_compatibility: false,
            },
            VerificationLevel::Full => Self {
                level,
                max_diagnostics: 500,
                resolve_pointcuts: true,
                check_spi: true,
                check_compatibility: true,
            },
        }
    }

    pub fn should_resolve(&self) -> bool {
        self.resolve_pointcuts || matches!(self.level, VerificationLevel::Full)
    }

    pub fn should_check_spi(&self) -> bool {
        self.check_spi || matches!(self.level, VerificationLevel::Full)
    }

    /// Compatibility checks need resolved types, so they imply resolution.
    pub fn should_check_compatibility(&self) -> bool {
        self.should_resolve()
            && (self.check_compatibility || matches!(self.level, VerificationLevel::Full))
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::for_level(VerificationLevel::Full)
    }
}
