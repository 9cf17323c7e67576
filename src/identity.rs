//! User-agent rotation for outbound requests.
//!
//! Each request presents the next browser identity from a fixed pool.
//! Rotation is round-robin so a long run covers the pool uniformly.

/// Browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
];

/// Referer headers sent alongside the user agent by scrape engines.
const REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://www.yahoo.com/",
    "https://duckduckgo.com/",
];

/// The identity presented on a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub referer: String,
}

impl Identity {
    /// Creates an identity from explicit values.
    pub fn new(user_agent: impl Into<String>, referer: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            referer: referer.into(),
        }
    }
}

/// Round-robin supplier of [`Identity`] values.
#[derive(Debug, Clone)]
pub struct IdentityRotator {
    user_agents: Vec<String>,
    referers: Vec<String>,
    next: usize,
}

impl IdentityRotator {
    /// Creates a rotator over the built-in pools.
    pub fn new() -> Self {
        Self::with_pools(
            USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            REFERERS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Creates a rotator over custom pools. Empty pools fall back to the
    /// built-in ones.
    pub fn with_pools(user_agents: Vec<String>, referers: Vec<String>) -> Self {
        let user_agents = if user_agents.is_empty() {
            USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            user_agents
        };
        let referers = if referers.is_empty() {
            REFERERS.iter().map(|s| s.to_string()).collect()
        } else {
            referers
        };
        Self {
            user_agents,
            referers,
            next: 0,
        }
    }

    /// Pins every request to one user agent.
    pub fn fixed(user_agent: impl Into<String>) -> Self {
        Self::with_pools(vec![user_agent.into()], Vec::new())
    }

    /// Returns the next identity; wraps around at the end of the pool.
    pub fn next_identity(&mut self) -> Identity {
        let index = self.next;
        self.next = self.next.wrapping_add(1);
        Identity {
            user_agent: self.user_agents[index % self.user_agents.len()].clone(),
            referer: self.referers[index % self.referers.len()].clone(),
        }
    }

    /// Returns the number of user agents in the pool.
    pub fn len(&self) -> usize {
        self.user_agents.len()
    }

    /// Always false: the pool falls back to the built-in list.
    pub fn is_empty(&self) -> bool {
        self.user_agents.is_empty()
    }
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self::new()
    }
}
