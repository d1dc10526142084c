use thiserror::Error;

pub type BoilerResult<T> = Result<T, BoilerError>;

#[derive(Debug, Error)]
pub enum BoilerError {
    #[error("expected 3 sensor values, got {0}")]
    WrongSensorCount(usize),

    #[error("sensor {index} reported a non-finite value: {value}")]
    NonFiniteReading { index: usize, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl BoilerError {
    /// True for errors caused by a caller handing in a malformed reading.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BoilerError::WrongSensorCount(_) | BoilerError::NonFiniteReading { .. }
        )
    }
}
