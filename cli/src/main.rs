use clap::{Args, Parser, Subcommand, ValueEnum};
use kryptapay::{
    AuthError, ClientConfig, Envelope, FileUpload, InvokeBody, InvokeOptions, KryptapayClient, Method,
    OtpCredentials, PasswordCredentials, SecurityCodeRequest, SignOutCredentials, StorageError, Timeouts,
    UploadOptions,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("client setup failed: {0}")]
    Client(#[from] kryptapay::Error),
    #[error("rpc failed: {0}")]
    Rpc(#[from] kryptapay::RpcError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Parser, Debug)]
#[command(name = "kp", about = "Kryptapay auth, rpc and storage CLI")]
struct Cli {
    #[arg(long, env = "KRYPTAPAY_URL")]
    url: String,

    #[arg(long, env = "KRYPTAPAY_KEY")]
    key: String,

    #[arg(long, env = "KRYPTAPAY_SECRET", hide_env_values = true)]
    secret: String,

    #[arg(long, env = "KRYPTAPAY_STORAGE_KEY")]
    storage_key: Option<String>,

    #[arg(long, help = "Keep the session in memory only")]
    no_persist: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current session, if any.
    Session,
    SignIn(SignInArgs),
    Otp {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        rotp: String,
        #[arg(long)]
        totp: Option<String>,
    },
    SignOut {
        #[arg(long)]
        user_id: String,
    },
    RequestCode {
        #[arg(long)]
        to: String,
        #[arg(long)]
        scope: String,
    },
    Invoke(InvokeArgs),
    Upload {
        /// Object path under the storage root.
        path: String,
        /// Local file to send.
        file: String,
        #[arg(long)]
        mime_type: Option<String>,
    },
}

#[derive(Args, Debug)]
struct SignInArgs {
    #[arg(long, required_unless_present = "phone", conflicts_with = "phone")]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long, env = "KRYPTAPAY_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct InvokeArgs {
    function: String,

    #[arg(long, value_enum, default_value_t = HttpMethod::Post)]
    method: HttpMethod,

    #[arg(long, help = "JSON request body")]
    body: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::Get,
            HttpMethod::Post => Self::Post,
            HttpMethod::Put => Self::Put,
            HttpMethod::Patch => Self::Patch,
            HttpMethod::Delete => Self::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig {
        url: cli.url,
        key: cli.key,
        secret: cli.secret,
        storage_key: cli.storage_key,
        persist_session: cli.no_persist.then_some(false),
        timeouts: Timeouts::default(),
    };
    let client = KryptapayClient::new(&config.url, &config.key, &config.secret, Some(config.options()))?;
    tracing::debug!(auth_url = client.auth_url(), storage_key = client.auth.storage_key(), "client ready");

    match cli.command {
        Command::Session => {
            let envelope = client.auth.get_session().await?;
            print_auth(&envelope.into_result().map(|data| json!({ "session": data.session })))
        }
        Command::SignIn(args) => {
            let credentials = match (args.email, args.phone) {
                (Some(email), _) => PasswordCredentials::with_email(email, args.password),
                (None, phone) => PasswordCredentials { email: None, phone, password: args.password },
            };
            let envelope = client.auth.sign_in_with_password(&credentials).await?;
            print_auth(&envelope.into_result().map(|data| json!({ "user": data.user })))
        }
        Command::Otp { user_id, rotp, totp } => {
            let credentials = OtpCredentials { user_id, rotp, totp };
            let envelope = client.auth.sign_in_with_otp(&credentials).await?;
            print_auth(&envelope.into_result().map(|data| json!({ "user": data.user, "session": data.session })))
        }
        Command::SignOut { user_id } => {
            let envelope = client.auth.sign_out(&SignOutCredentials { user_id }).await?;
            print_auth(&envelope.into_result())
        }
        Command::RequestCode { to, scope } => {
            let envelope = client.auth.request_security_code(&SecurityCodeRequest { to, scope }).await?;
            print_auth(&envelope.into_result())
        }
        Command::Invoke(args) => run_invoke(&client, args).await,
        Command::Upload { path, file, mime_type } => {
            let options = UploadOptions { mime_type, ..UploadOptions::default() };
            let envelope = client.storage.upload(FileUpload { path, file_uri: file, options }).await;
            print_storage(envelope)
        }
    }
}

async fn run_invoke(client: &KryptapayClient, args: InvokeArgs) -> Result<(), CliError> {
    let body = args.body.as_deref().map(serde_json::from_str::<Value>).transpose()?.map(InvokeBody::Json);
    let options = InvokeOptions { method: Some(args.method.into()), body, ..InvokeOptions::default() };
    let data = client.rpc.invoke(&args.function, options).await?;
    print_json(&json!({ "data": data, "error": null }))
}

fn print_auth(result: &Result<Value, AuthError>) -> Result<(), CliError> {
    match result {
        Ok(data) => print_json(&json!({ "data": data, "error": null })),
        Err(err) => {
            print_json(&json!({ "data": null, "error": err.to_json() }))?;
            Err(CliError::Rejected(err.name().to_owned()))
        }
    }
}

fn print_storage(envelope: Envelope<Value, StorageError>) -> Result<(), CliError> {
    match envelope.into_result() {
        Ok(data) => print_json(&json!({ "data": data, "error": null })),
        Err(err) => {
            let message = err.to_string();
            print_json(&json!({ "data": null, "error": { "message": message, "body": err.body() } }))?;
            Err(CliError::Rejected(message))
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
