use tracing::{info, warn};

use super::{CliError, Ctx};
use crate::config::LoginArgs;
use crate::infra::session::{Credentials, UserDescriptor};

pub fn login(ctx: &Ctx, args: LoginArgs) -> Result<(), CliError> {
    let token = args.token.trim();
    if token.is_empty() {
        return Err(CliError::InvalidInput("token must not be empty".into()));
    }

    let mut credentials = Credentials::new(token);
    if let Some(email) = args.email {
        credentials = credentials.with_user(UserDescriptor {
            id: None,
            email,
            name: args.name,
        });
    }

    ctx.session.sign_in(credentials)?;
    match ctx.session.path() {
        Some(path) => info!(path = %path.display(), "signed in"),
        None => warn!("session is in memory only; credentials will not outlive this command"),
    }
    println!("Signed in.");
    Ok(())
}

pub async fn logout(ctx: &Ctx) -> Result<(), CliError> {
    ctx.session.clear().await?;
    println!("Signed out.");
    Ok(())
}
