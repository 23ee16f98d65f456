use std::sync::Arc;

use application::{
    AuthService, FanoutEngine, FriendService, GroupService, MessageService, SearchService,
    UserService,
};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub friend_service: Arc<FriendService>,
    pub group_service: Arc<GroupService>,
    pub message_service: Arc<MessageService>,
    pub search_service: Arc<SearchService>,
    pub engine: Arc<FanoutEngine>,
    pub jwt_service: Arc<JwtService>,
}
