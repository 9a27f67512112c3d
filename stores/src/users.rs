//! User store.
//!
//! `items` is the admin user list, replaced by the full list, the active-only
//! list or a search. `current` holds the last user loaded by id, or the
//! signed-in user after `FetchMe`. Admin mutations apply the returned user
//! to both; their failures go to the caller only.

use crate::request::{Outcome, RequestId, call_api};
use tourbook_core::domain::{ProfileUpdate, User};
use tourbook_core::effect::Effect;
use tourbook_core::environment::ApiEnvironment;
use tourbook_core::reducer::Reducer;
use tourbook_core::{ApiError, EntityId, EntityState, SmallVec, smallvec};

const FETCH_ALL_FAILED: &str = "Failed to fetch users";
const FETCH_ACTIVE_FAILED: &str = "Failed to fetch active users";
const SEARCH_FAILED: &str = "Failed to search users";
const FETCH_ONE_FAILED: &str = "Failed to fetch user";
const FETCH_ME_FAILED: &str = "Failed to fetch profile";
const UPDATE_PROFILE_FAILED: &str = "Failed to update profile";
const UPDATE_FAILED: &str = "Failed to update user";
const DELETE_FAILED: &str = "Failed to delete user";
const ACTIVATE_FAILED: &str = "Failed to activate user";
const DEACTIVATE_FAILED: &str = "Failed to deactivate user";

/// User store state
pub type UsersState = EntityState<User>;

/// User store actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsersAction {
    /// `GET /api/admin/users`
    FetchAll {
        /// Correlation id
        request: RequestId,
    },
    /// User list fetch finished
    FetchedAll {
        /// Correlation id
        request: RequestId,
        /// Users or reason
        result: Outcome<Vec<User>>,
    },
    /// `GET /api/admin/users/active`
    FetchActive {
        /// Correlation id
        request: RequestId,
    },
    /// `GET /api/admin/users/search?searchTerm=`
    Search {
        /// Correlation id
        request: RequestId,
        /// Name or email fragment
        term: String,
    },
    /// Search finished; replaces the list but leaves the loading flags alone
    Searched {
        /// Correlation id
        request: RequestId,
        /// Matching users or reason
        result: Outcome<Vec<User>>,
    },
    /// `GET /api/admin/users/{id}`
    FetchById {
        /// Correlation id
        request: RequestId,
        /// User to load
        id: EntityId,
    },
    /// Fetch by id finished
    FetchedById {
        /// Correlation id
        request: RequestId,
        /// User or reason
        result: Outcome<User>,
    },
    /// `GET /api/user/me`
    FetchMe {
        /// Correlation id
        request: RequestId,
    },
    /// Profile fetch finished
    FetchedMe {
        /// Correlation id
        request: RequestId,
        /// Signed-in user or reason
        result: Outcome<User>,
    },
    /// `PUT /api/user/profile`
    UpdateProfile {
        /// Correlation id
        request: RequestId,
        /// Changed fields
        update: ProfileUpdate,
    },
    /// Profile update finished
    ProfileUpdated {
        /// Correlation id
        request: RequestId,
        /// Updated user or reason
        result: Outcome<User>,
    },
    /// `PUT /api/admin/users/{id}`
    Update {
        /// Correlation id
        request: RequestId,
        /// User to change
        id: EntityId,
        /// Changed fields
        update: ProfileUpdate,
    },
    /// Admin update finished
    Updated {
        /// Correlation id
        request: RequestId,
        /// Updated user or reason
        result: Outcome<User>,
    },
    /// `DELETE /api/admin/users/{id}`
    Delete {
        /// Correlation id
        request: RequestId,
        /// User to delete
        id: EntityId,
    },
    /// Deletion finished
    Deleted {
        /// Correlation id
        request: RequestId,
        /// Deleted id or reason
        result: Outcome<EntityId>,
    },
    /// `PUT /api/admin/users/{id}/activate` or `/deactivate`
    SetActive {
        /// Correlation id
        request: RequestId,
        /// User to change
        id: EntityId,
        /// Target flag
        active: bool,
    },
    /// Activation change finished
    ActiveSet {
        /// Correlation id
        request: RequestId,
        /// Changed id and flag, or reason
        result: Outcome<(EntityId, bool)>,
    },
    /// Forget the last error
    ClearError,
    /// Forget the user loaded by id
    ClearCurrent,
}

impl UsersAction {
    /// Correlation id when this is a terminal action
    #[must_use]
    pub const fn completes(&self) -> Option<RequestId> {
        match self {
            Self::FetchedAll { request, .. }
            | Self::Searched { request, .. }
            | Self::FetchedById { request, .. }
            | Self::FetchedMe { request, .. }
            | Self::ProfileUpdated { request, .. }
            | Self::Updated { request, .. }
            | Self::Deleted { request, .. }
            | Self::ActiveSet { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Reducer for [`UsersState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct UsersReducer;

impl Reducer for UsersReducer {
    type State = UsersState;
    type Action = UsersAction;
    type Environment = ApiEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut UsersState,
        action: UsersAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<UsersAction>; 4]> {
        match action {
            UsersAction::FetchAll { request } => {
                state.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ALL_FAILED,
                    |api| async move { api.fetch_users().await },
                    move |result| UsersAction::FetchedAll { request, result },
                )]
            },
            UsersAction::FetchActive { request } => {
                state.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ACTIVE_FAILED,
                    |api| async move { api.fetch_active_users().await },
                    move |result| UsersAction::FetchedAll { request, result },
                )]
            },
            UsersAction::FetchedAll { result, .. } => {
                match result {
                    Ok(users) => state.replace_all(users),
                    Err(rejection) => state.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            UsersAction::Search { request, term } => smallvec![call_api(
                env,
                SEARCH_FAILED,
                move |api| async move { api.search_users(&term).await },
                move |result| UsersAction::Searched { request, result },
            )],
            UsersAction::Searched { result, .. } => {
                if let Ok(users) = result {
                    state.items = users;
                }
                smallvec![Effect::None]
            },
            UsersAction::FetchById { request, id } => {
                state.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ONE_FAILED,
                    move |api| async move { api.fetch_user(&id).await },
                    move |result| UsersAction::FetchedById { request, result },
                )]
            },
            UsersAction::FetchedById { result, .. } => {
                match result {
                    Ok(user) => state.set_current(user),
                    Err(rejection) => state.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            UsersAction::FetchMe { request } => {
                state.begin_load();
                smallvec![call_api(
                    env,
                    FETCH_ME_FAILED,
                    |api| async move { api.fetch_me().await },
                    move |result| UsersAction::FetchedMe { request, result },
                )]
            },
            UsersAction::FetchedMe { result, .. } => {
                match result {
                    Ok(user) => state.set_current(user),
                    Err(rejection) => state.fail(&rejection),
                }
                smallvec![Effect::None]
            },
            UsersAction::UpdateProfile { request, update } => smallvec![call_api(
                env,
                UPDATE_PROFILE_FAILED,
                move |api| async move { api.update_profile(&update).await },
                move |result| UsersAction::ProfileUpdated { request, result },
            )],
            UsersAction::ProfileUpdated { result, .. } => {
                if let Ok(user) = result {
                    state.replace(user.clone());
                    state.current = Some(user);
                }
                smallvec![Effect::None]
            },
            UsersAction::Update {
                request,
                id,
                update,
            } => smallvec![call_api(
                env,
                UPDATE_FAILED,
                move |api| async move { api.update_user(&id, &update).await },
                move |result| UsersAction::Updated { request, result },
            )],
            UsersAction::Updated { result, .. } => {
                if let Ok(user) = result {
                    state.replace(user);
                }
                smallvec![Effect::None]
            },
            UsersAction::Delete { request, id } => smallvec![call_api(
                env,
                DELETE_FAILED,
                move |api| async move { api.delete_user(&id).await.map(|()| id) },
                move |result| UsersAction::Deleted { request, result },
            )],
            UsersAction::Deleted { result, .. } => {
                if let Ok(id) = result {
                    state.remove(&id);
                }
                smallvec![Effect::None]
            },
            UsersAction::SetActive { request, id, active } => {
                let fallback = if active { ACTIVATE_FAILED } else { DEACTIVATE_FAILED };
                smallvec![call_api(
                    env,
                    fallback,
                    move |api| async move {
                        if active {
                            api.activate_user(&id).await?;
                        } else {
                            api.deactivate_user(&id).await?;
                        }
                        Ok::<_, ApiError>((id, active))
                    },
                    move |result| UsersAction::ActiveSet { request, result },
                )]
            },
            UsersAction::ActiveSet { result, .. } => {
                if let Ok((id, active)) = result {
                    state.update_with(&id, |user| user.is_active = active);
                }
                smallvec![Effect::None]
            },
            UsersAction::ClearError => {
                state.clear_error();
                smallvec![Effect::None]
            },
            UsersAction::ClearCurrent => {
                state.current = None;
                smallvec![Effect::None]
            },
        }
    }
}
