use std::collections::HashSet;
use teloxide::types::UserId;
use tokio::sync::Mutex;

/// Users who asked for the raised file size ceiling. Lives as long as the process.
#[derive(Default)]
pub struct PremiumUsers {
    users: Mutex<HashSet<UserId>>,
}

impl PremiumUsers {
    /// Flips the user's premium mode and returns the new state.
    pub async fn toggle(&self, user_id: UserId) -> bool {
        let mut users = self.users.lock().await;

        if users.remove(&user_id) {
            false
        } else {
            users.insert(user_id);
            true
        }
    }

    pub async fn contains(&self, user_id: UserId) -> bool {
        self.users.lock().await.contains(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toggling_twice_restores_state() {
        let premium = PremiumUsers::default();
        let user = UserId(42);

        assert!(!premium.contains(user).await);
        assert!(premium.toggle(user).await);
        assert!(premium.contains(user).await);
        assert_eq!(premium.len().await, 1);

        assert!(!premium.toggle(user).await);
        assert!(!premium.contains(user).await);
        assert_eq!(premium.len().await, 0);
    }

    #[tokio::test]
    async fn users_are_independent() {
        let premium = PremiumUsers::default();
        premium.toggle(UserId(1)).await;

        assert!(premium.contains(UserId(1)).await);
        assert!(!premium.contains(UserId(2)).await);
    }
}
