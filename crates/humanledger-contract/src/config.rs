//! Contract configuration.

/// Key layout used by the contract's bulk operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    /// Inclusive lower bound scanned by `queryAllHuman`
    pub scan_start: String,
    /// Exclusive upper bound scanned by `queryAllHuman`
    pub scan_end: String,
    /// `initLedger` writes its seed records to `{key_prefix}{index}`
    pub key_prefix: String,
}

impl ContractConfig {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.key_prefix.is_empty() {
            return Err("key_prefix must not be empty".into());
        }
        if self.scan_start >= self.scan_end {
            return Err(format!(
                "scan range [{:?}, {:?}) is empty", self.scan_start, self.scan_end
            ));
        }
        Ok(())
    }

    /// Key of the `index`-th seed record.
    pub fn seed_key(&self, index: usize) -> String {
        format!("{}{}", self.key_prefix, index)
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            scan_start: "Human0".to_string(),
            scan_end: "Human999".to_string(),
            key_prefix: "Human".to_string(),
        }
    }
}
