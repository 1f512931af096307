//! State behind the admin user-management panel.
//!
//! [`UserPanel`] holds what the panel shows: the loaded users, the search and
//! club filters, the add-user form and a queue of [`Notice`]s for the UI to
//! display as toasts. Everything derived from the user list is recomputed on
//! each call. Every successful change triggers a full reload of the list.

use crate::portal::models::{NewUser, User};
use crate::portal::Portal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};


/// Club list shown before any user has been loaded.
pub const DEFAULT_CLUBS: &[&str] = &["Main"];
pub const DEFAULT_NEW_USER_CLUB: &str = "IEDC";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields")]
    MissingFields,
    #[error("A user with this email already exists")]
    DuplicateEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClubFilter {
    All,
    Club(String),
}

impl ClubFilter {
    pub fn label(&self) -> &str {
        match self {
            ClubFilter::All => "All",
            ClubFilter::Club(club) => club,
        }
    }

    fn accepts(&self, user: &User) -> bool {
        match self {
            ClubFilter::All => true,
            ClubFilter::Club(club) => user.club.as_deref() == Some(club.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserForm {
    pub name: String,
    pub email: String,
    pub club: String,
}

impl Default for NewUserForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            club: DEFAULT_NEW_USER_CLUB.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistic {
    pub label: String,
    pub count: usize,
}

pub struct UserPanel {
    portal: Arc<Portal>,
    users: Vec<User>,
    pub search_term: String,
    pub club_filter: ClubFilter,
    pub new_user: NewUserForm,
    add_form_open: bool,
    loading: bool,
    notices: Vec<Notice>,
}

impl UserPanel {
    /// A panel that has not loaded yet; call [`UserPanel::refresh`] to fill it.
    pub fn new(portal: Arc<Portal>) -> Self {
        Self {
            portal,
            users: Vec::new(),
            search_term: String::new(),
            club_filter: ClubFilter::All,
            new_user: NewUserForm::default(),
            add_form_open: false,
            loading: true,
            notices: Vec::new(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_add_form_open(&self) -> bool {
        self.add_form_open
    }

    /// Hands the pending notices to the caller.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push(Notice {
            level,
            message: message.to_string(),
        });
    }

    /// Reloads every user. On failure the previous list is kept.
    pub async fn refresh(&mut self) {
        self.loading = true;
        match self.portal.list_users().await {
            Ok(users) => self.users = users,
            Err(e) => {
                error!("loading users failed: {}", e);
                self.notify(NoticeLevel::Error, "Error loading users");
            }
        }
        self.loading = false;
    }

    pub fn toggle_add_form(&mut self) {
        self.add_form_open = !self.add_form_open;
    }

    /// Clears the form and closes it.
    pub fn reset_form(&mut self) {
        self.new_user = NewUserForm::default();
        self.add_form_open = false;
    }

    /// Checks the form against the loaded users.
    pub fn validate_new_user(&self) -> Result<NewUser, ValidationError> {
        let name = self.new_user.name.trim();
        let email = self.new_user.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let email = email.to_lowercase();
        if self.users.iter().any(|user| user.email.to_lowercase() == email) {
            return Err(ValidationError::DuplicateEmail);
        }

        Ok(NewUser::new(name, &email, self.new_user.club.clone()))
    }

    /// Submits the add-user form. Returns whether a user was created.
    pub async fn add_user(&mut self) -> bool {
        let user = match self.validate_new_user() {
            Ok(user) => user,
            Err(e) => {
                self.notify(NoticeLevel::Error, &e.to_string());
                return false;
            }
        };

        match self.portal.add_user(&user).await {
            Ok(id) => {
                info!(%id, "user added from admin panel");
                self.notify(NoticeLevel::Success, "User added successfully");
                self.reset_form();
                self.refresh().await;
                true
            }
            Err(e) => {
                error!("adding user failed: {}", e);
                self.notify(NoticeLevel::Error, "Error adding user");
                false
            }
        }
    }

    pub async fn delete_user(&mut self, id: &str) -> bool {
        if self.portal.delete_user(id).await {
            self.notify(NoticeLevel::Success, "User deleted successfully");
            self.refresh().await;
            true
        } else {
            self.notify(NoticeLevel::Error, "Error deleting user");
            false
        }
    }

    pub async fn update_club(&mut self, id: &str, club: &str) -> bool {
        match self.portal.update_user_club(id, club).await {
            Ok(()) => {
                self.notify(NoticeLevel::Success, "User club updated successfully");
                self.refresh().await;
                true
            }
            Err(e) => {
                error!(%id, "updating user club failed: {}", e);
                self.notify(NoticeLevel::Error, "Error updating user club");
                false
            }
        }
    }

    fn distinct_clubs(&self) -> Vec<String> {
        let mut clubs: Vec<String> = Vec::new();
        for club in self.users.iter().filter_map(|user| user.club.as_ref()) {
            if !clubs.contains(club) {
                clubs.push(club.clone());
            }
        }
        clubs
    }

    /// Clubs seen among the loaded users, in first-seen order.
    pub fn available_clubs(&self) -> Vec<String> {
        if self.users.is_empty() {
            return DEFAULT_CLUBS.iter().map(|club| club.to_string()).collect();
        }
        self.distinct_clubs()
    }

    pub fn club_options(&self) -> Vec<ClubFilter> {
        std::iter::once(ClubFilter::All)
            .chain(self.available_clubs().into_iter().map(ClubFilter::Club))
            .collect()
    }

    /// Users whose email or name contains the search term (ignoring case) and
    /// whose club passes the club filter.
    pub fn filtered_users(&self) -> Vec<&User> {
        let term = self.search_term.to_lowercase();
        self.users
            .iter()
            .filter(|user| {
                user.email.to_lowercase().contains(&term) || user.name.to_lowercase().contains(&term)
            })
            .filter(|user| self.club_filter.accepts(user))
            .collect()
    }

    pub fn club_count(&self, club: &str) -> usize {
        self.users
            .iter()
            .filter(|user| user.club.as_deref() == Some(club))
            .count()
    }

    /// The total followed by one entry per club.
    pub fn statistics(&self) -> Vec<Statistic> {
        let mut statistics = vec![Statistic {
            label: "Total Users".to_string(),
            count: self.users.len(),
        }];
        statistics.extend(self.distinct_clubs().into_iter().map(|club| Statistic {
            count: self.club_count(&club),
            label: format!("{} Members", club),
        }));
        statistics
    }
}
