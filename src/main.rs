#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let rocket = mailsweep::rocket();
    log::info!("Starting Mailsweep API Server");
    let _ = rocket.launch().await?;
    Ok(())
}
