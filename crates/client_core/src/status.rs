#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Succeeded(String),
    Failed(String),
}

impl RequestStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Succeeded(message) | Self::Failed(message) => Some(message),
            Self::Idle | Self::Loading => None,
        }
    }

    pub fn start(&mut self) {
        *self = Self::Loading;
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        *self = Self::Succeeded(message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = Self::Failed(message.into());
    }

    pub fn settle(&mut self) {
        if self.is_loading() {
            *self = Self::Idle;
        }
    }

    /// User dismissal. An in-flight operation cannot be dismissed.
    pub fn dismiss(&mut self) {
        if !self.is_loading() {
            *self = Self::Idle;
        }
    }
}

/// Monotonic generation counter: last request wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RequestTokens {
    current: u64,
    detached: bool,
}

impl RequestTokens {
    pub(crate) fn issue(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub(crate) fn is_current(&self, token: u64) -> bool {
        !self.detached && self.current == token
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached
    }

    pub(crate) fn detach(&mut self) {
        self.current += 1;
        self.detached = true;
    }
}
