/// Upper bound of outputs in a single deposit, caps the work done per call.
pub const MAX_DEPOSIT_OUTPUTS: usize = 10;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_deposit_outputs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_deposit_outputs: MAX_DEPOSIT_OUTPUTS,
        }
    }
}

impl Config {
    pub fn with_max_deposit_outputs(mut self, max_deposit_outputs: usize) -> Self {
        self.max_deposit_outputs = max_deposit_outputs;
        self
    }
}
