use super::{account::AccountRole, website::Website};

/// Operator context that outlives a single run: which website is being
/// managed and which role the backend granted at login.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workspace {
    selected_config_id: Option<String>,
    role: Option<AccountRole>,
}

impl Workspace {
    pub fn new(selected_config_id: Option<String>, role: Option<AccountRole>) -> Self {
        Self {
            selected_config_id,
            role,
        }
    }

    pub fn selected_config_id(&self) -> Option<&str> {
        self.selected_config_id.as_deref()
    }

    pub fn role(&self) -> Option<AccountRole> {
        self.role
    }

    /// The only way the selection changes.
    pub fn select_website(&mut self, config_id: Option<String>) {
        self.selected_config_id = config_id;
    }

    pub fn set_role(&mut self, role: Option<AccountRole>) {
        self.role = role;
    }

    /// Keeps the stored selection when the site still exists, otherwise
    /// falls back to the first site. Returns the resolved website.
    pub fn resolve_selection<'a>(&mut self, websites: &'a [Website]) -> Option<&'a Website> {
        let resolved = self
            .selected_config_id
            .as_deref()
            .and_then(|config_id| websites.iter().find(|site| site.config_id == config_id))
            .or_else(|| websites.first());

        self.select_website(resolved.map(|site| site.config_id.clone()));
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(config_id: &str) -> Website {
        Website {
            id: format!("id-{config_id}"),
            config_id: config_id.to_owned(),
            name: config_id.to_uppercase(),
            domain: format!("{config_id}.example.com"),
        }
    }

    #[test]
    fn keeps_stored_selection_when_still_listed() {
        let mut workspace = Workspace::new(Some("b".to_owned()), None);
        let sites = vec![site("a"), site("b")];

        let resolved = workspace.resolve_selection(&sites);

        assert_eq!(resolved.map(|s| s.config_id.as_str()), Some("b"));
        assert_eq!(workspace.selected_config_id(), Some("b"));
    }

    #[test]
    fn falls_back_to_first_site_when_stored_one_is_gone() {
        let mut workspace = Workspace::new(Some("gone".to_owned()), None);
        let sites = vec![site("a"), site("b")];

        workspace.resolve_selection(&sites);

        assert_eq!(workspace.selected_config_id(), Some("a"));
    }

    #[test]
    fn clears_selection_when_no_sites_exist() {
        let mut workspace = Workspace::new(Some("a".to_owned()), Some(AccountRole::Admin));

        let resolved = workspace.resolve_selection(&[]);

        assert!(resolved.is_none());
        assert_eq!(workspace.selected_config_id(), None);
        assert_eq!(workspace.role(), Some(AccountRole::Admin));
    }
}
