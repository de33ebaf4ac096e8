use anyhow::{Context as _, Result};
use dyn_clone::DynClone;
use lettre::message::{Mailbox, MultiPart};
use lettre::{FileTransport, Message, Transport as _};
use rand::seq::IndexedRandom as _;
use rand::rng;
use rocket::fairing::{self, Fairing};
use rocket::figment::Figment;
use rocket::tokio::task::spawn_blocking;
use rocket::{async_trait, error, info, Build, Rocket};
use rocket_dyn_templates::tera::{Context, Tera};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn email_sender_fairing() -> impl Fairing {
    fairing::AdHoc::try_on_ignite("Email Sender", |rocket| {
        Box::pin(async {
            match fairing_impl(&rocket) {
                Ok(sender) => Ok(rocket.manage(sender)),
                Err(e) => {
                    error!("failed to initialize email sender:\n{e:?}");
                    Err(rocket)
                }
            }
        })
    })
}

fn fairing_impl(rocket: &Rocket<Build>) -> Result<Box<dyn EmailSender>> {
    Ok(Box::new(EmailSenderImpl::from_figment(rocket.figment())?))
}

#[async_trait]
pub(crate) trait EmailSender: Send + Sync + fmt::Debug + DynClone {
    async fn send(&self, recipient: Mailbox, email: &dyn EmailMessage) -> Result<()>;
}

dyn_clone::clone_trait_object!(EmailSender);

pub(crate) trait EmailMessage: Send + Sync {
    fn subject(&self) -> String;

    /// Name of the templates without the `.html.tera` and `.txt.tera` suffixes.
    fn template_name(&self) -> String;

    fn template_context(&self) -> Result<Context> {
        Ok(Context::new())
    }
}

/// Writes every message as an `.eml` file into the outbox directory,
/// where a separate relay picks them up.
#[derive(Clone)]
pub(crate) struct EmailSenderImpl {
    sender: Mailbox,
    transport: FileTransport,
    tera: Arc<Tera>,
}

impl fmt::Debug for EmailSenderImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSenderImpl")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EmailSender for EmailSenderImpl {
    async fn send(&self, recipient: Mailbox, email: &dyn EmailMessage) -> Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(email.subject())
            .multipart(render_email_body(&self.tera, email)?)
            .context("failed to create email message")?;
        let transport = self.transport.clone();
        let subject = email.subject();
        spawn_blocking(move || transport.send(&message))
            .await?
            .context("failed to write email to the outbox")?;
        info!("📨 queued email \"{subject}\"");
        Ok(())
    }
}

fn render_email_body(tera: &Tera, email: &dyn EmailMessage) -> Result<MultiPart> {
    let template_name = email.template_name();
    let mut template_context = email.template_context()?;
    template_context.insert("greeting", random_greeting());
    let html_template_name = format!("{template_name}.html.tera");
    let text_template_name = format!("{template_name}.txt.tera");

    Ok(MultiPart::alternative_plain_html(
        tera.render(&text_template_name, &template_context)
            .context("failed to render tera template")?,
        tera.render(&html_template_name, &template_context)
            .context("failed to render tera template")?,
    ))
}

impl EmailSenderImpl {
    pub(crate) fn from_figment(figment: &Figment) -> Result<Self> {
        let config: EmailSenderConfig = figment
            .extract_inner("email")
            .context("failed to read email sender configuration")?;
        std::fs::create_dir_all(&config.outbox_dir)
            .with_context(|| format!("failed to create outbox {:?}", config.outbox_dir))?;
        Ok(Self {
            sender: config.sender,
            transport: FileTransport::new(&config.outbox_dir),
            tera: Arc::new(create_tera(&config.templates)?),
        })
    }
}

fn create_tera(glob: &str) -> Result<Tera> {
    let mut tera = Tera::new(glob).context("failed to initialize Tera")?;
    tera.build_inheritance_chains()
        .context("failed to build tera's inheritance chain")?;
    Ok(tera)
}

fn random_greeting() -> &'static str {
    const GREETINGS: &[&str] = &["Hi", "Hello", "Salut", "Bonjour", "Cheers", "Santé", "Hey there"];
    GREETINGS.choose(&mut rng()).copied().unwrap_or("Hi")
}

#[derive(Debug, Deserialize)]
struct EmailSenderConfig {
    sender: Mailbox,
    outbox_dir: PathBuf,
    #[serde(default = "default_templates")]
    templates: String,
}

fn default_templates() -> String {
    "emails/**/*.tera".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting;

    impl EmailMessage for Greeting {
        fn subject(&self) -> String {
            "Hello".to_owned()
        }

        fn template_name(&self) -> String {
            "greeting".to_owned()
        }

        fn template_context(&self) -> Result<Context> {
            let mut context = Context::new();
            context.insert("name", "Ada");
            Ok(context)
        }
    }

    fn tera() -> Tera {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            ("greeting.txt.tera", "{{ greeting }} {{ name }}"),
            ("greeting.html.tera", "<p>{{ greeting }} <b>{{ name }}</b></p>"),
        ])
        .unwrap();
        tera
    }

    #[test]
    fn renders_plain_and_html_parts() {
        let body = render_email_body(&tera(), &Greeting).unwrap();
        let formatted = String::from_utf8(body.formatted()).unwrap();
        assert!(formatted.contains("Ada"));
        assert!(formatted.contains("text/plain"));
        assert!(formatted.contains("text/html"));
    }

    #[test]
    fn missing_templates_are_an_error() {
        assert!(render_email_body(&Tera::default(), &Greeting).is_err());
    }

    #[rocket::async_test]
    async fn writes_messages_into_the_outbox() {
        let outbox = std::env::temp_dir().join(format!("palate-outbox-{}", std::process::id()));
        std::fs::create_dir_all(&outbox).unwrap();
        let sender = EmailSenderImpl {
            sender: "Palate Collectif <hello@example.org>".parse().unwrap(),
            transport: FileTransport::new(&outbox),
            tera: Arc::new(tera()),
        };
        sender
            .send("Ada <ada@example.org>".parse().unwrap(), &Greeting)
            .await
            .unwrap();
        let written = std::fs::read_dir(&outbox).unwrap().count();
        std::fs::remove_dir_all(&outbox).unwrap();
        assert!(written >= 1);
    }
}
