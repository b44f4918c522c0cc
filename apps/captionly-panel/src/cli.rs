use anyhow::{Context, Result};
use captionly_db::repositories::profile_repo::ProfileRepository;
use sqlx::PgPool;
use std::env;
use std::fs;

use crate::config::PanelConfig;
use crate::services::activity_service::ActivityLogger;
use crate::services::auth_service::hash_password;
use crate::services::entitlement_service::EntitlementService;
use crate::services::user_service::{CreateUser, UserService};

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<()> {
    let activity = ActivityLogger::new(pool.clone());
    let users = UserService::new(
        ProfileRepository::new(pool.clone()),
        EntitlementService::new(pool.clone(), activity.clone()),
        activity,
    );

    let profile = users
        .create_user(
            None,
            CreateUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                is_admin,
                require_confirmation: false,
            },
        )
        .await?;

    let role = if profile.is_admin { "admin" } else { "user" };
    println!("Created {} '{}' <{}>.", role, profile.username, profile.email);
    Ok(())
}

pub async fn reset_password(pool: &PgPool, email: &str, new_pass: &str) -> Result<()> {
    let hash = hash_password(new_pass)?;

    let updated = ProfileRepository::new(pool.clone())
        .update_password(email, &hash)
        .await
        .context("Failed to update password in database")?;

    if !updated {
        anyhow::bail!("No user with email '{}'.", email);
    }
    println!("Password for '{}' has been successfully reset.", email);
    Ok(())
}

pub async fn print_info(pool: &PgPool, config: &PanelConfig) -> Result<()> {
    let admins = ProfileRepository::new(pool.clone()).count_admins().await?;

    println!("\n=== CAPTIONLY INFO ===");
    println!("Version:    {}", crate::utils::panel_version());
    println!("Listen:     0.0.0.0:{}", config.listen_port);
    println!("Admin Path: {}", config.admin_path);
    println!("Login URL:  <YOUR_DOMAIN>/login");
    println!("Model:      {}", config.gemini.model);
    println!("Admins:     {}", admins);
    if admins == 0 {
        println!("Create one with: admin create-user <username> <email> <password> --admin");
    }
    println!("======================\n");
    Ok(())
}

pub fn install_service() -> Result<()> {
    let exe_path = env::current_exe()?;
    let exe_name = exe_path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Executable name is not valid UTF-8")?
        .to_string();
    let working_dir = env::current_dir()?;

    let service_content = format!(
        r#"[Unit]
Description=Captionly caption generator
After=network.target postgresql.service

[Service]
Type=simple
User=root
WorkingDirectory={}
ExecStart={} serve
Restart=always
EnvironmentFile={}/.env

[Install]
WantedBy=multi-user.target
"#,
        working_dir.display(),
        exe_path.display(),
        working_dir.display()
    );

    let service_path = format!("/etc/systemd/system/{}.service", exe_name);

    if unsafe { libc::getuid() } != 0 {
        return Err(anyhow::anyhow!(
            "This command must be run as root (sudo) to install systemd service."
        ));
    }

    fs::write(&service_path, service_content)
        .with_context(|| format!("Failed to write service file to {}", service_path))?;

    println!("Systemd service created at {}", service_path);
    println!("You can now start the service using:");
    println!("  systemctl daemon-reload");
    println!("  systemctl enable --now {}", exe_name);

    Ok(())
}
