/// An authenticated user of the host system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUser {
    pub id: String,
    pub roles: Vec<String>,
}

impl HostUser {
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
