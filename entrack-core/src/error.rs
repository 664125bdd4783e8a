use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity type mismatch for {class}: accessor expects {expected}")]
    EntityTypeMismatch {
        class: &'static str,
        expected: &'static str,
    },

    #[error("Value type mismatch for {class}.{property}: expected {expected}, got {actual}")]
    ValueTypeMismatch {
        class: &'static str,
        property: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cannot compare {class}.{property}: snapshot is {snapshot}, current value is {current}")]
    IncomparableValues {
        class: &'static str,
        property: &'static str,
        snapshot: &'static str,
        current: &'static str,
    },

    #[error("Host error: {0}")]
    Host(String),
}
