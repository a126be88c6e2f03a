// ABOUTME: Example application demonstrating SMS sending through the GSM gateway
// ABOUTME: Shows usage of ClientBuilder::quick_gateway with a ready-span lookup before sending

pub(crate) use argh::FromArgs;
use ami_gsm::client::{AmiConnection, ClientBuilder, GsmGateway, ReadySpanPolicy, SmsMessage};
use std::error::Error;

/// Example application to show the simplest case of sending an SMS message
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the manager username
    #[argh(option, short = 'u')]
    username: Option<String>,

    /// the manager secret
    #[argh(option, short = 's')]
    secret: Option<String>,

    /// the hostname of IP address of the PBX (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the manager port of the PBX (default: 5038)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// span to send through; the first ready span when omitted
    #[argh(option)]
    span: Option<String>,

    /// keep looking for a ready span after the first non-ready answer
    #[argh(switch)]
    any_ready: bool,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::TRACE
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(5038);
    let username = cli_args.username.unwrap_or_default();
    let secret = cli_args.secret.unwrap_or_default();

    let client = ClientBuilder::quick_gateway(format!("{host}:{port}"), username, secret)
        .await
        .map_err(|e| {
            eprintln!("Connection/login failed: {e}");
            Box::<dyn Error>::from(e.to_string())
        })?;

    println!("Connected and logged in");

    let span_id = match cli_args.span {
        Some(span_id) => span_id,
        None => {
            let policy = if cli_args.any_ready {
                ReadySpanPolicy::FirstReady
            } else {
                ReadySpanPolicy::FirstResponse
            };

            match client.get_gsm_ready_span_with(policy).await? {
                Some(span) => {
                    println!("Using ready span {}", span.span_id);
                    span.span_id
                }
                None => {
                    eprintln!("No span is ready");
                    let _ = client.disconnect().await;
                    return Err(Box::<dyn Error>::from("no ready span"));
                }
            }
        }
    };

    let sms = SmsMessage::new(&cli_args.message, &cli_args.to, span_id);

    let result = client.gsm_send_sms(&sms).await;

    if let Err(e) = client.disconnect().await {
        eprintln!("Warning: Disconnect failed: {e}");
    }

    match result {
        Ok(receipt) => {
            println!(
                "Message accepted as {} part(s), ActionID {}",
                receipt.parts, receipt.action_id
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to send message: {e}");
            Err(Box::<dyn Error>::from(e.to_string()))
        }
    }
}
