use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageSubscriptions,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    /// Favorites and shopping cart.
    ManageOwnMarks,
    ManageOwnRecipes,
    ManageSubscriptions,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.user.role;

        ACTION_TABLE
            .iter()
            .find_map(|(table_role, actions)| {
                if role != table_role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::schema::User;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user: User {
                id: 1,
                email: String::from("a@example.com"),
                username: String::from("a"),
                first_name: String::new(),
                last_name: String::new(),
                password: String::new(),
                role,
                date_joined: Utc::now(),
            },
            token_id: String::from("t"),
        }
    }

    #[test]
    fn only_admins_manage_all_recipes() {
        assert!(!ActionType::ManageAllRecipes.authenticate(&session(UserRole::User)));
        assert!(ActionType::ManageAllRecipes.authenticate(&session(UserRole::Admin)));
        assert!(ActionType::CreateRecipes.authenticate(&session(UserRole::User)));
    }
}
