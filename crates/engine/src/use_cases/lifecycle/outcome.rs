/// Successful result of a lifecycle operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Created(T),
    /// Success with no body (destroy).
    NoContent,
}

impl<T> Outcome<T> {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::Created(_) => 201,
            Self::NoContent => 204,
        }
    }

    pub fn into_body(self) -> Option<T> {
        match self {
            Self::Ok(body) | Self::Created(body) => Some(body),
            Self::NoContent => None,
        }
    }
}
