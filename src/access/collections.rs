//! Per-collection access predicates

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{Access, Where};
use crate::models::User;

/// Operation being authorised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

/// A managed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Users,
    Media,
    Properties,
    PropertyTypes,
    Categories,
    Faqs,
    KnowledgeBase,
    VerificationRequests,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Users,
        Collection::Media,
        Collection::Properties,
        Collection::PropertyTypes,
        Collection::Categories,
        Collection::Faqs,
        Collection::KnowledgeBase,
        Collection::VerificationRequests,
    ];

    /// URL slug of the collection
    pub fn slug(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Media => "media",
            Collection::Properties => "properties",
            Collection::PropertyTypes => "property-types",
            Collection::Categories => "categories",
            Collection::Faqs => "faqs",
            Collection::KnowledgeBase => "knowledge-base",
            Collection::VerificationRequests => "verification-requests",
        }
    }

    /// Evaluate the collection's access predicate for `operation`
    pub fn access(&self, operation: Operation, user: Option<&User>) -> Access {
        match self {
            Collection::Users => users(operation, user),
            Collection::Media => media(operation, user),
            Collection::Properties => properties(operation, user),
            Collection::PropertyTypes => reference_data(operation, user),
            Collection::Categories | Collection::Faqs | Collection::KnowledgeBase => {
                editorial(operation, user)
            }
            Collection::VerificationRequests => verification_requests(operation, user),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(User::is_admin)
}

fn user_id(user: Option<&User>) -> Option<i64> {
    user.map(|u| u.id)
}

/// Media: public or unowned files are readable by anyone, owners see their
/// own, admins see everything. Only owners and admins may mutate.
pub fn media(operation: Operation, user: Option<&User>) -> Access {
    if is_admin(user) {
        return Access::Allow;
    }

    match operation {
        Operation::Read => {
            let mut visible = vec![
                Where::exists("uploaded_by", false),
                Where::equals("is_public", true),
            ];
            if let Some(id) = user_id(user) {
                visible.push(Where::equals("uploaded_by", id));
            }
            Access::Filter(Where::Or(visible))
        }
        Operation::Create => Access::from_bool(user.is_some()),
        // Anonymous requests compare against a null id and match nothing.
        Operation::Update | Operation::Delete => {
            Access::Filter(Where::equals("uploaded_by", user_id(user)))
        }
    }
}

/// Properties: approved, non-draft listings are public; owners see and edit
/// their own listings in any state.
pub fn properties(operation: Operation, user: Option<&User>) -> Access {
    if is_admin(user) {
        return Access::Allow;
    }

    match operation {
        Operation::Read => {
            let published = Where::And(vec![
                Where::equals("status", "approved"),
                Where::equals("is_draft", false),
            ]);
            match user_id(user) {
                Some(id) => Access::Filter(Where::Or(vec![published, Where::equals("owner_id", id)])),
                None => Access::Filter(published),
            }
        }
        Operation::Create => Access::from_bool(user.is_some()),
        Operation::Update | Operation::Delete => {
            Access::Filter(Where::equals("owner_id", user_id(user)))
        }
    }
}

/// Reference data (property types): world-readable, admin-managed
pub fn reference_data(operation: Operation, user: Option<&User>) -> Access {
    match operation {
        Operation::Read => Access::Allow,
        _ => Access::from_bool(is_admin(user)),
    }
}

/// Editorial content (categories, FAQs, knowledge base): published
/// non-draft entries are public, admins manage everything
pub fn editorial(operation: Operation, user: Option<&User>) -> Access {
    if is_admin(user) {
        return Access::Allow;
    }

    match operation {
        Operation::Read => Access::Filter(Where::And(vec![
            Where::equals("published", true),
            Where::equals("is_draft", false),
        ])),
        _ => Access::Deny,
    }
}

/// Users: anyone may register, users read and update themselves
pub fn users(operation: Operation, user: Option<&User>) -> Access {
    if is_admin(user) {
        return Access::Allow;
    }

    match (operation, user) {
        (Operation::Create, _) => Access::Allow,
        (Operation::Read | Operation::Update, Some(u)) => Access::Filter(Where::equals("id", u.id)),
        _ => Access::Deny,
    }
}

/// Verification requests: users file and read their own, admins review
pub fn verification_requests(operation: Operation, user: Option<&User>) -> Access {
    if is_admin(user) {
        return Access::Allow;
    }

    match (operation, user) {
        (Operation::Read, Some(u)) => Access::Filter(Where::equals("user_id", u.id)),
        (Operation::Create, Some(_)) => Access::Allow,
        _ => Access::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Document, Value};
    use crate::models::UserRole;

    fn user(id: i64, role: UserRole) -> User {
        let mut u = User::new(format!("u{}@example.com", id), format!("User {}", id), "hash".into(), role);
        u.id = id;
        u
    }

    struct MediaDoc {
        uploaded_by: Option<i64>,
        is_public: bool,
    }

    impl Document for MediaDoc {
        fn field(&self, name: &str) -> Value {
            match name {
                "uploaded_by" => self.uploaded_by.into(),
                "is_public" => self.is_public.into(),
                _ => Value::Null,
            }
        }
    }

    #[test]
    fn test_collection_slug_round_trip() {
        for c in Collection::ALL {
            assert_eq!(c.slug().parse::<Collection>().unwrap(), c);
        }
        assert!("nope".parse::<Collection>().is_err());
    }

    #[test]
    fn test_media_admin_unrestricted() {
        let admin = user(1, UserRole::Admin);
        for op in [Operation::Read, Operation::Create, Operation::Update, Operation::Delete] {
            assert_eq!(media(op, Some(&admin)), Access::Allow);
        }
    }

    #[test]
    fn test_media_anonymous_mutation_matches_nothing() {
        let doc = MediaDoc { uploaded_by: None, is_public: true };
        let access = media(Operation::Delete, None);
        assert!(matches!(access, Access::Filter(_)));
        assert!(!access.permits(&doc));
        assert!(media(Operation::Create, None).is_denied());
    }

    #[test]
    fn test_media_owner_can_update() {
        let owner = user(4, UserRole::User);
        let doc = MediaDoc { uploaded_by: Some(4), is_public: false };
        assert!(media(Operation::Update, Some(&owner)).permits(&doc));
        assert!(!media(Operation::Update, Some(&user(5, UserRole::Agent))).permits(&doc));
    }

    #[test]
    fn test_properties_read_visibility() {
        struct PropertyDoc(&'static str, bool, Option<i64>);
        impl Document for PropertyDoc {
            fn field(&self, name: &str) -> Value {
                match name {
                    "status" => self.0.into(),
                    "is_draft" => self.1.into(),
                    "owner_id" => self.2.into(),
                    _ => Value::Null,
                }
            }
        }

        let approved = PropertyDoc("approved", false, Some(9));
        let pending_own = PropertyDoc("pending", false, Some(2));
        let draft = PropertyDoc("approved", true, Some(9));

        assert!(properties(Operation::Read, None).permits(&approved));
        assert!(!properties(Operation::Read, None).permits(&pending_own));
        assert!(!properties(Operation::Read, None).permits(&draft));

        let agent = user(2, UserRole::Agent);
        assert!(properties(Operation::Read, Some(&agent)).permits(&pending_own));
        assert!(!properties(Operation::Update, Some(&agent)).permits(&approved));
    }

    #[test]
    fn test_editorial_and_reference_data() {
        let admin = user(1, UserRole::Admin);
        let member = user(2, UserRole::User);

        assert_eq!(reference_data(Operation::Read, None), Access::Allow);
        assert!(reference_data(Operation::Create, Some(&member)).is_denied());
        assert_eq!(reference_data(Operation::Delete, Some(&admin)), Access::Allow);

        assert!(editorial(Operation::Update, Some(&member)).is_denied());
        assert!(matches!(editorial(Operation::Read, None), Access::Filter(_)));
    }

    #[test]
    fn test_users_and_verification_requests() {
        let member = user(3, UserRole::User);
        assert_eq!(users(Operation::Create, None), Access::Allow);
        assert!(users(Operation::Read, None).is_denied());
        assert_eq!(
            users(Operation::Read, Some(&member)),
            Access::Filter(Where::equals("id", 3i64))
        );
        assert!(users(Operation::Delete, Some(&member)).is_denied());

        assert!(verification_requests(Operation::Read, None).is_denied());
        assert_eq!(verification_requests(Operation::Create, Some(&member)), Access::Allow);
        assert!(verification_requests(Operation::Update, Some(&member)).is_denied());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::access::{Document, Value};
    use crate::models::UserRole;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct MediaDoc {
        uploaded_by: Option<i64>,
        is_public: bool,
    }

    impl Document for MediaDoc {
        fn field(&self, name: &str) -> Value {
            match name {
                "uploaded_by" => self.uploaded_by.into(),
                "is_public" => self.is_public.into(),
                _ => Value::Null,
            }
        }
    }

    fn non_admin_role() -> impl Strategy<Value = UserRole> {
        prop_oneof![Just(UserRole::Agent), Just(UserRole::User)]
    }

    fn requester(id: i64, role: UserRole) -> User {
        let mut u = User::new("r@example.com".into(), "R".into(), "hash".into(), role);
        u.id = id;
        u
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn unowned_media_readable_anonymously(is_public in any::<bool>()) {
            let doc = MediaDoc { uploaded_by: None, is_public };
            prop_assert!(media(Operation::Read, None).permits(&doc));
        }

        #[test]
        fn private_foreign_media_hidden_from_non_admins(
            owner in 1i64..1000,
            requester_id in 1i64..1000,
            role in non_admin_role(),
        ) {
            prop_assume!(owner != requester_id);
            let doc = MediaDoc { uploaded_by: Some(owner), is_public: false };
            let user = requester(requester_id, role);
            prop_assert!(!media(Operation::Read, Some(&user)).permits(&doc));
            prop_assert!(!media(Operation::Read, None).permits(&doc));
        }

        #[test]
        fn owners_always_see_their_media(owner in 1i64..1000, is_public in any::<bool>(), role in non_admin_role()) {
            let doc = MediaDoc { uploaded_by: Some(owner), is_public };
            let user = requester(owner, role);
            prop_assert!(media(Operation::Read, Some(&user)).permits(&doc));
            prop_assert!(media(Operation::Delete, Some(&user)).permits(&doc));
        }

        #[test]
        fn sql_binds_match_placeholders(owner in proptest::option::of(1i64..1000), role in non_admin_role()) {
            let user = owner.map(|id| requester(id, role));
            for op in [Operation::Read, Operation::Update, Operation::Delete] {
                if let Some(filter) = media(op, user.as_ref()).filter() {
                    let sql = filter.to_sql();
                    prop_assert_eq!(sql.clause.matches('?').count(), sql.binds.len());
                }
            }
        }
    }
}
