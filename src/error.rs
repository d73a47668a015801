use std::fmt;

#[derive(Debug)]
pub enum ConvertError {
    InvalidConfiguration(String),
    NotSvg(String),
    Io(std::io::Error),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ConvertError::NotSvg(message) => write!(f, "not an svg document: {}", message),
            ConvertError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(value: std::io::Error) -> Self {
        ConvertError::Io(value)
    }
}
