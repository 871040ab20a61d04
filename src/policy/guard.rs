use std::collections::BTreeSet;

use derive_more::Display;
use once_cell::sync::Lazy;

use crate::model::role::Role;
use crate::policy::identity::IdentityContext;

/// Entry requirements of one application section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRule {
    pub requires_auth: bool,
    pub requires_guest: bool,
    /// Empty means any authenticated role.
    pub allowed_roles: BTreeSet<Role>,
}

impl RouteRule {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn guest_only() -> Self {
        Self {
            requires_guest: true,
            ..Self::default()
        }
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requires_auth: true,
            requires_guest: false,
            allowed_roles: roles.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GuardDecision {
    #[display(fmt = "allow")]
    Allow,
    #[display(fmt = "redirect to {}", _0)]
    RedirectTo(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Decides whether navigation into a section may proceed.
#[derive(Debug, Clone)]
pub struct RouteAccessGuard {
    login_path: String,
    default_path: String,
}

impl RouteAccessGuard {
    pub fn new(login_path: impl Into<String>, default_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            default_path: default_path.into(),
        }
    }

    pub fn evaluate(&self, rule: &RouteRule, identity: &IdentityContext) -> GuardDecision {
        // One read, so every step below sees the same actor.
        let actor = identity.current();

        if rule.requires_guest && actor.is_some() {
            return GuardDecision::RedirectTo(self.default_path.clone());
        }
        if rule.requires_auth && actor.is_none() {
            return GuardDecision::RedirectTo(self.login_path.clone());
        }
        if !rule.allowed_roles.is_empty()
            && !actor.is_some_and(|a| rule.allowed_roles.contains(&a.role))
        {
            return GuardDecision::RedirectTo(self.default_path.clone());
        }
        GuardDecision::Allow
    }
}

/// Path prefixes and the rules guarding them.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<(Vec<String>, RouteRule)>,
}

/// Sections of the portal front end.
pub static PORTAL_ROUTES: Lazy<RouteTable> = Lazy::new(|| {
    RouteTable::new()
        .route("/", RouteRule::public())
        .route("/features", RouteRule::public())
        .route("/about", RouteRule::public())
        .route("/login", RouteRule::guest_only())
        .route("/register", RouteRule::guest_only())
        .route("/dashboard", RouteRule::authenticated())
        .route("/dashboard/employees", RouteRule::roles([Role::Manager]))
        .route("/dashboard/announcements/new", RouteRule::roles([Role::Manager]))
});

fn segments(path: &str) -> Vec<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, rule: RouteRule) -> Self {
        self.entries.push((segments(path), rule));
        self
    }

    /// Rule of the longest registered prefix of `path`. The root only matches
    /// itself.
    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        let wanted = segments(path);
        self.entries
            .iter()
            .filter(|(prefix, _)| {
                if prefix.is_empty() {
                    wanted.is_empty()
                } else {
                    wanted.starts_with(prefix)
                }
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, rule)| rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::Actor;

    fn guard() -> RouteAccessGuard {
        RouteAccessGuard::new("/login", "/dashboard")
    }

    fn login() -> GuardDecision {
        GuardDecision::RedirectTo("/login".into())
    }

    fn home() -> GuardDecision {
        GuardDecision::RedirectTo("/dashboard".into())
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        let anonymous = IdentityContext::new();
        assert_eq!(guard().evaluate(&RouteRule::authenticated(), &anonymous), login());
        assert_eq!(guard().evaluate(&RouteRule::public(), &anonymous), GuardDecision::Allow);
        assert_eq!(guard().evaluate(&RouteRule::guest_only(), &anonymous), GuardDecision::Allow);
    }

    #[test]
    fn signed_in_users_skip_guest_pages() {
        let ctx = IdentityContext::with_actor(Actor::new(1, Role::Employee));
        assert_eq!(guard().evaluate(&RouteRule::guest_only(), &ctx), home());
    }

    #[test]
    fn employee_is_sent_home_from_manager_pages() {
        let ctx = IdentityContext::with_actor(Actor::new(1, Role::Employee));
        let rule = RouteRule::roles([Role::Manager]);
        assert_eq!(guard().evaluate(&rule, &ctx), home());

        ctx.clear();
        ctx.establish(Actor::new(2, Role::Manager));
        assert_eq!(guard().evaluate(&rule, &ctx), GuardDecision::Allow);
    }

    #[test]
    fn role_lists_without_auth_still_need_an_actor() {
        let rule = RouteRule {
            requires_auth: false,
            requires_guest: false,
            allowed_roles: [Role::Manager].into_iter().collect(),
        };
        assert_eq!(guard().evaluate(&rule, &IdentityContext::new()), home());
    }

    #[test]
    fn guard_follows_logout() {
        let ctx = IdentityContext::with_actor(Actor::new(1, Role::Employee));
        assert!(guard().evaluate(&RouteRule::authenticated(), &ctx).is_allowed());
        ctx.clear();
        assert_eq!(guard().evaluate(&RouteRule::authenticated(), &ctx), login());
    }

    #[test]
    fn lookup_uses_the_longest_prefix() {
        let table = &*PORTAL_ROUTES;
        assert_eq!(table.lookup("/"), Some(&RouteRule::public()));
        assert_eq!(table.lookup("/login?next=/dashboard"), Some(&RouteRule::guest_only()));
        assert_eq!(table.lookup("/dashboard/leaves/3"), Some(&RouteRule::authenticated()));
        assert_eq!(
            table.lookup("/dashboard/employees/"),
            Some(&RouteRule::roles([Role::Manager]))
        );
        assert_eq!(table.lookup("/nowhere"), None);
    }

    #[test]
    fn decisions_render_for_logs() {
        assert_eq!(GuardDecision::Allow.to_string(), "allow");
        assert_eq!(login().to_string(), "redirect to /login");
    }
}
