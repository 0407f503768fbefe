pub mod get_current_user;
pub mod login_user;
pub mod logout_user;
pub mod register_user;

pub use get_current_user::{CurrentUserResponse, GetCurrentUserUseCase};
pub use login_user::{LoginUserCommand, LoginUserResponse, LoginUserUseCase};
pub use logout_user::{LogoutUserCommand, LogoutUserUseCase};
pub use register_user::{RegisterUserCommand, RegisterUserResponse, RegisterUserUseCase};
