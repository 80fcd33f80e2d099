//! User directory controller: the single owner of the in-memory user list.
//!
//! Every operation that talks to the service is split in two halves:
//! a synchronous `begin_*` step on [`DirectoryState`] that updates local
//! state and yields a [`Request`], and [`DirectoryState::apply`], which
//! consumes the matching [`Completion`]. [`UserDirectory`] pairs the state
//! with a [`UserApi`] and runs requests either inline (`async` methods) or as
//! detached tokio tasks whose completions are applied later, in whatever
//! order they arrive.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::api::{NewUser, UserApi, UserField, UserId, UserRecord};
use crate::error::ApiError;
use crate::search::filter_users;

/// The four service operations, each with one user-facing failure message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Add,
    Update,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Fetch => "Failed to fetch users",
            Operation::Add => "Failed to add user",
            Operation::Update => "Failed to update user",
            Operation::Delete => "Failed to delete user",
        }
    }
}

/// A service call produced by a `begin_*` step.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    ListAll,
    Create(NewUser),
    Update(UserRecord),
    Delete(UserId),
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::ListAll => Operation::Fetch,
            Request::Create(_) => Operation::Add,
            Request::Update(_) => Operation::Update,
            Request::Delete(_) => Operation::Delete,
        }
    }

    /// Perform the call. Never fails: the outcome travels in the completion.
    pub async fn execute(self, api: &dyn UserApi) -> Completion {
        match self {
            Request::ListAll => Completion::Listed(api.list_all().await),
            Request::Create(new_user) => Completion::Created(api.create(&new_user).await),
            Request::Update(user) => {
                let result = api.update(&user.id, &user).await;
                Completion::Updated { id: user.id, result }
            }
            Request::Delete(id) => {
                let result = api.delete(&id).await;
                Completion::Deleted { id, result }
            }
        }
    }
}

/// Outcome of one [`Request`], ready to be applied to the state.
#[derive(Debug)]
pub enum Completion {
    Listed(Result<Vec<UserRecord>, ApiError>),
    Created(Result<UserRecord, ApiError>),
    Updated {
        id: UserId,
        result: Result<UserRecord, ApiError>,
    },
    Deleted {
        id: UserId,
        result: Result<(), ApiError>,
    },
}

impl Completion {
    pub fn operation(&self) -> Operation {
        match self {
            Completion::Listed(_) => Operation::Fetch,
            Completion::Created(_) => Operation::Add,
            Completion::Updated { .. } => Operation::Update,
            Completion::Deleted { .. } => Operation::Delete,
        }
    }
}

/// Session state of the dashboard. Only mutated through its methods.
#[derive(Clone, Debug, Default)]
pub struct DirectoryState {
    users: Vec<UserRecord>,
    editing_user: Option<UserRecord>,
    new_user: NewUser,
    search_term: String,
    loading: bool,
    error: Option<String>,
    in_flight: usize,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn editing_user(&self) -> Option<&UserRecord> {
        self.editing_user.as_ref()
    }

    pub fn new_user(&self) -> &NewUser {
        &self.new_user
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Requests handed out and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Users matching the current search term, recomputed on every call.
    pub fn visible_users(&self) -> Vec<&UserRecord> {
        filter_users(&self.users, &self.search_term)
    }

    pub fn begin_initialize(&mut self) -> Request {
        self.loading = true;
        self.issue(Request::ListAll)
    }

    /// `None` when either field is blank; nothing changes in that case.
    pub fn begin_add(&mut self, name: &str, email: &str) -> Option<Request> {
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
        };
        if !new_user.is_complete() {
            tracing::debug!("add ignored: name or email is blank");
            return None;
        }
        Some(self.issue(Request::Create(new_user)))
    }

    pub fn update_new_user_field(&mut self, field: UserField, value: impl Into<String>) {
        self.new_user.set_field(field, value.into());
    }

    pub fn begin_edit(&mut self, user: &UserRecord) {
        self.editing_user = Some(user.clone());
    }

    /// Edits the working copy only; `users` is untouched until a save lands.
    pub fn update_editing_field(&mut self, field: UserField, value: impl Into<String>) {
        if let Some(editing) = self.editing_user.as_mut() {
            editing.set_field(field, value.into());
        }
    }

    /// Sends the current working copy. `None` when nothing is being edited.
    pub fn begin_save(&mut self) -> Option<Request> {
        let user = self.editing_user.clone()?;
        Some(self.issue(Request::Update(user)))
    }

    pub fn cancel_edit(&mut self) {
        self.editing_user = None;
    }

    pub fn begin_delete(&mut self, id: UserId) -> Request {
        self.issue(Request::Delete(id))
    }

    /// Stored verbatim; no trimming or case folding.
    pub fn set_search_term(&mut self, text: impl Into<String>) {
        self.search_term = text.into();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn issue(&mut self, request: Request) -> Request {
        self.in_flight += 1;
        tracing::debug!(operation = ?request.operation(), in_flight = self.in_flight, "request issued");
        request
    }

    /// Apply one completion. Completions for records that are gone by now
    /// are applied as-is: an update or delete of a missing id is a no-op.
    pub fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let op = completion.operation();
        match completion {
            Completion::Listed(result) => {
                self.loading = false;
                match result {
                    Ok(users) => {
                        tracing::info!(count = users.len(), "users fetched");
                        self.users = users;
                        self.error = None;
                    }
                    Err(e) => self.fail(op, &e),
                }
            }
            Completion::Created(Ok(user)) => {
                tracing::info!(user_id = %user.id, "user added");
                self.users.push(user);
                self.new_user = NewUser::default();
            }
            Completion::Updated { id, result: Ok(user) } => {
                tracing::info!(user_id = %id, "user updated");
                for slot in self.users.iter_mut().filter(|u| u.id == id) {
                    *slot = user.clone();
                }
                self.editing_user = None;
            }
            Completion::Deleted { id, result: Ok(()) } => {
                let before = self.users.len();
                self.users.retain(|u| u.id != id);
                tracing::info!(user_id = %id, removed = before - self.users.len(), "user deleted");
            }
            Completion::Created(Err(e))
            | Completion::Updated { result: Err(e), .. }
            | Completion::Deleted { result: Err(e), .. } => self.fail(op, &e),
        }
    }

    fn fail(&mut self, op: Operation, cause: &ApiError) {
        tracing::warn!(operation = ?op, error = %cause, "user service call failed");
        self.error = Some(op.failure_message().to_string());
    }
}

/// Controller pairing a [`DirectoryState`] with the service it mirrors.
#[derive(Clone)]
pub struct UserDirectory {
    api: Arc<dyn UserApi>,
    state: DirectoryState,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory").field("state", &self.state).finish_non_exhaustive()
    }
}

impl UserDirectory {
    pub fn new(api: Arc<dyn UserApi>) -> Self {
        Self {
            api,
            state: DirectoryState::new(),
        }
    }

    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DirectoryState {
        &mut self.state
    }

    pub fn visible_users(&self) -> Vec<&UserRecord> {
        self.state.visible_users()
    }

    pub async fn initialize(&mut self) {
        let request = self.state.begin_initialize();
        self.run(request).await;
    }

    pub async fn add_user(&mut self, name: &str, email: &str) {
        if let Some(request) = self.state.begin_add(name, email) {
            self.run(request).await;
        }
    }

    pub fn begin_edit(&mut self, user: &UserRecord) {
        self.state.begin_edit(user);
    }

    pub fn update_editing_field(&mut self, field: UserField, value: impl Into<String>) {
        self.state.update_editing_field(field, value);
    }

    pub async fn save_edit(&mut self) {
        if let Some(request) = self.state.begin_save() {
            self.run(request).await;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.state.cancel_edit();
    }

    pub async fn delete_user(&mut self, id: UserId) {
        let request = self.state.begin_delete(id);
        self.run(request).await;
    }

    pub fn set_search_term(&mut self, text: impl Into<String>) {
        self.state.set_search_term(text);
    }

    async fn run(&mut self, request: Request) {
        let completion = request.execute(self.api.as_ref()).await;
        self.state.apply(completion);
    }

    /// Run `request` on the current tokio runtime; the completion is sent to
    /// `tx` and must be handed back through [`UserDirectory::apply`].
    pub fn spawn(
        &self,
        handle: &tokio::runtime::Handle,
        request: Request,
        tx: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        handle.spawn(async move {
            let completion = request.execute(api.as_ref()).await;
            if tx.send(completion).is_err() {
                tracing::debug!("completion dropped: receiver closed");
            }
        })
    }

    pub fn apply(&mut self, completion: Completion) {
        self.state.apply(completion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory service; `fail` makes every call error out.
    #[derive(Default)]
    struct FakeApi {
        users: Mutex<Vec<UserRecord>>,
        next_id: AtomicUsize,
        calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl FakeApi {
        fn seeded(users: Vec<UserRecord>) -> Arc<Self> {
            let next = users.len() + 1;
            Arc::new(Self {
                users: Mutex::new(users),
                next_id: AtomicUsize::new(next),
                ..Default::default()
            })
        }

        fn set_failing(&self, on: bool) {
            self.fail.store(on, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(ApiError::other("unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl UserApi for FakeApi {
        async fn list_all(&self) -> Result<Vec<UserRecord>, ApiError> {
            self.check()?;
            Ok(self.users.lock().unwrap().clone())
        }

        async fn create(&self, user: &NewUser) -> Result<UserRecord, ApiError> {
            self.check()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
            let rec = UserRecord::new(id, user.name.clone(), user.email.clone());
            self.users.lock().unwrap().push(rec.clone());
            Ok(rec)
        }

        async fn update(&self, id: &UserId, user: &UserRecord) -> Result<UserRecord, ApiError> {
            self.check()?;
            Ok(UserRecord { id: id.clone(), ..user.clone() })
        }

        async fn delete(&self, _id: &UserId) -> Result<(), ApiError> {
            self.check()
        }
    }

    fn ann_and_bob() -> Vec<UserRecord> {
        vec![
            UserRecord::new(1u64, "Ann", "a@x.com"),
            UserRecord::new(2u64, "Bob", "b@y.com"),
        ]
    }

    fn ids(users: &[UserRecord]) -> Vec<UserId> {
        users.iter().map(|u| u.id.clone()).collect()
    }

    async fn loaded(api: &Arc<FakeApi>) -> UserDirectory {
        let mut dir = UserDirectory::new(api.clone());
        dir.initialize().await;
        dir
    }

    #[tokio::test]
    async fn initialize_populates_and_clears_loading() {
        let api = FakeApi::seeded(ann_and_bob());
        let dir = loaded(&api).await;
        assert!(!dir.state().is_loading());
        assert!(dir.state().error().is_none());
        assert_eq!(ids(dir.state().users()), vec![UserId::Number(1), UserId::Number(2)]);
        assert_eq!(dir.state().in_flight(), 0);
    }

    #[tokio::test]
    async fn initialize_failure_sets_error_and_clears_loading() {
        let api = FakeApi::seeded(ann_and_bob());
        api.set_failing(true);
        let dir = loaded(&api).await;
        assert!(!dir.state().is_loading());
        assert_eq!(dir.state().error(), Some("Failed to fetch users"));
        assert!(dir.state().users().is_empty());
    }

    #[test]
    fn loading_is_set_only_while_fetch_outstanding() {
        let mut state = DirectoryState::new();
        assert!(!state.is_loading());
        let req = state.begin_initialize();
        assert_eq!(req, Request::ListAll);
        assert!(state.is_loading());
        state.apply(Completion::Listed(Err(ApiError::other("x"))));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn successful_fetch_clears_previous_error() {
        let api = FakeApi::seeded(ann_and_bob());
        api.set_failing(true);
        let mut dir = loaded(&api).await;
        api.set_failing(false);
        dir.initialize().await;
        assert!(dir.state().error().is_none());
        assert_eq!(dir.state().users().len(), 2);
    }

    #[tokio::test]
    async fn add_appends_server_record_and_resets_inputs() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        dir.state_mut().update_new_user_field(UserField::Name, "Cy");
        dir.state_mut().update_new_user_field(UserField::Email, "c@z.com");
        let (name, email) = (dir.state().new_user().name.clone(), dir.state().new_user().email.clone());

        dir.add_user(&name, &email).await;

        let users = dir.state().users();
        assert_eq!(users.len(), 3);
        assert_eq!(users[2].id, UserId::Number(3));
        assert_eq!(users[2].name, "Cy");
        assert_eq!(dir.state().new_user(), &NewUser::default());
    }

    #[tokio::test]
    async fn add_with_blank_field_is_noop() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let calls = api.calls();

        dir.add_user("", "e@x.com").await;
        dir.add_user("N", "").await;
        dir.add_user("   ", "e@x.com").await;

        assert_eq!(api.calls(), calls);
        assert_eq!(dir.state().users().len(), 2);
        assert_eq!(dir.state().in_flight(), 0);
    }

    #[tokio::test]
    async fn add_failure_keeps_users_and_inputs() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        dir.state_mut().update_new_user_field(UserField::Name, "Cy");
        api.set_failing(true);

        dir.add_user("Cy", "c@z.com").await;

        assert_eq!(dir.state().error(), Some("Failed to add user"));
        assert_eq!(dir.state().users().len(), 2);
        assert_eq!(dir.state().new_user().name, "Cy");
    }

    #[tokio::test]
    async fn editing_touches_only_the_working_copy() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let bob = dir.state().users()[1].clone();

        dir.begin_edit(&bob);
        dir.update_editing_field(UserField::Name, "Robert");

        assert_eq!(dir.state().editing_user().map(|u| u.name.as_str()), Some("Robert"));
        assert_eq!(dir.state().users()[1].name, "Bob");
    }

    #[tokio::test]
    async fn save_replaces_in_place_and_closes_edit() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let ann = dir.state().users()[0].clone();

        dir.begin_edit(&ann);
        dir.update_editing_field(UserField::Email, "ann@x.com");
        dir.save_edit().await;

        assert!(dir.state().editing_user().is_none());
        assert_eq!(ids(dir.state().users()), vec![UserId::Number(1), UserId::Number(2)]);
        assert_eq!(dir.state().users()[0].email, "ann@x.com");
    }

    #[tokio::test]
    async fn save_failure_keeps_edit_open_and_users_unchanged() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let ann = dir.state().users()[0].clone();
        dir.begin_edit(&ann);
        dir.update_editing_field(UserField::Name, "Anne");
        let before_edit = dir.state().editing_user().cloned();
        let before_users = dir.state().users().to_vec();
        api.set_failing(true);

        dir.save_edit().await;

        assert_eq!(dir.state().error(), Some("Failed to update user"));
        assert_eq!(dir.state().editing_user().cloned(), before_edit);
        assert_eq!(dir.state().users(), before_users.as_slice());
    }

    #[tokio::test]
    async fn save_without_edit_is_noop() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let calls = api.calls();
        dir.save_edit().await;
        assert_eq!(api.calls(), calls);
    }

    #[tokio::test]
    async fn cancel_edit_makes_no_call() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        let calls = api.calls();
        let bob = dir.state().users()[1].clone();
        dir.begin_edit(&bob);
        dir.update_editing_field(UserField::Name, "nope");
        dir.cancel_edit();
        assert!(dir.state().editing_user().is_none());
        assert_eq!(dir.state().users()[1].name, "Bob");
        assert_eq!(api.calls(), calls);
    }

    #[tokio::test]
    async fn delete_removes_exactly_that_id() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        dir.delete_user(UserId::Number(1)).await;
        assert_eq!(ids(dir.state().users()), vec![UserId::Number(2)]);
    }

    #[tokio::test]
    async fn delete_failure_leaves_users_and_sets_error() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        api.set_failing(true);
        dir.delete_user(UserId::Number(1)).await;
        assert_eq!(dir.state().users().len(), 2);
        assert_eq!(dir.state().error(), Some("Failed to delete user"));
    }

    #[tokio::test]
    async fn newer_error_overwrites_older() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        api.set_failing(true);
        dir.delete_user(UserId::Number(1)).await;
        dir.add_user("N", "e").await;
        assert_eq!(dir.state().error(), Some("Failed to add user"));
        dir.state_mut().dismiss_error();
        assert!(dir.state().error().is_none());
    }

    #[tokio::test]
    async fn replaying_successful_operations_matches_expected_list() {
        let api = FakeApi::seeded(vec![
            UserRecord::new(1u64, "A", "a@a"),
            UserRecord::new(2u64, "B", "b@b"),
            UserRecord::new(3u64, "C", "c@c"),
        ]);
        let mut dir = loaded(&api).await;

        dir.add_user("D", "d@d").await; // id 4
        dir.delete_user(UserId::Number(2)).await;
        let c = dir.state().users()[1].clone();
        dir.begin_edit(&c);
        dir.update_editing_field(UserField::Name, "C2");
        dir.save_edit().await;
        dir.add_user("E", "e@e").await; // id 5

        let names: Vec<_> = dir.visible_users().iter().map(|u| u.name.clone()).collect();
        assert_eq!(names, vec!["A", "C2", "D", "E"]);
        assert_eq!(
            ids(dir.state().users()),
            vec![UserId::Number(1), UserId::Number(3), UserId::Number(4), UserId::Number(5)]
        );
    }

    #[test]
    fn stale_delete_is_lenient() {
        let mut state = DirectoryState::new();
        state.begin_initialize();
        state.apply(Completion::Listed(Ok(ann_and_bob())));

        let first = state.begin_delete(UserId::Number(1));
        let second = state.begin_delete(UserId::Number(1));
        assert_eq!(first, second);
        assert_eq!(state.in_flight(), 2);

        state.apply(Completion::Deleted { id: UserId::Number(1), result: Ok(()) });
        state.apply(Completion::Deleted { id: UserId::Number(1), result: Ok(()) });
        assert_eq!(ids(state.users()), vec![UserId::Number(2)]);
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn completions_apply_in_arrival_order() {
        let mut state = DirectoryState::new();
        state.begin_initialize();
        state.apply(Completion::Listed(Ok(ann_and_bob())));

        let _del = state.begin_delete(UserId::Number(2));
        state.begin_edit(&UserRecord::new(1u64, "Ann", "a@x.com"));
        let _upd = state.begin_save();

        // Update lands before the delete that was issued first.
        state.apply(Completion::Updated {
            id: UserId::Number(1),
            result: Ok(UserRecord::new(1u64, "Ann B", "a@x.com")),
        });
        state.apply(Completion::Deleted { id: UserId::Number(2), result: Ok(()) });

        assert_eq!(state.users(), &[UserRecord::new(1u64, "Ann B", "a@x.com")]);
    }

    #[tokio::test]
    async fn search_filters_view_but_not_users() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = loaded(&api).await;
        dir.set_search_term("AN");
        let visible: Vec<_> = dir.visible_users().into_iter().cloned().collect();
        assert_eq!(ids(&visible), vec![UserId::Number(1)]);
        assert_eq!(dir.state().users().len(), 2);
        assert_eq!(dir.state().search_term(), "AN");
    }

    #[tokio::test]
    async fn spawned_request_delivers_completion() {
        let api = FakeApi::seeded(ann_and_bob());
        let mut dir = UserDirectory::new(api.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let req = dir.state_mut().begin_initialize();
        dir.spawn(&tokio::runtime::Handle::current(), req, tx)
            .await
            .unwrap();
        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.operation(), Operation::Fetch);
        dir.apply(completion);
        assert_eq!(dir.state().users().len(), 2);
        assert!(!dir.state().is_loading());
    }
}
