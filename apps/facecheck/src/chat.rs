//! Interactive chat loop driving the submission flow from stdin.

use std::path::PathBuf;

use client_core::{
    interpret_reply, pick_from_path,
    presentation::{render_error, render_transcript, render_verdict},
    Completion, CompareTransport, Locale, SubmissionFlow, Theme,
};
use shared::domain::ImageSlot;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "commands: 1 <path> | 2 <path> | compare | reset | show | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Select { slot: ImageSlot, path: PathBuf },
    Compare,
    Reset,
    Show,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ChatCommand, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "1" | "2" => {
            if rest.is_empty() {
                return Err(format!("missing image path after '{head}'"));
            }
            let slot = if head == "1" {
                ImageSlot::First
            } else {
                ImageSlot::Second
            };
            Ok(ChatCommand::Select {
                slot,
                path: PathBuf::from(rest),
            })
        }
        "compare" | "c" => Ok(ChatCommand::Compare),
        "reset" | "new" => Ok(ChatCommand::Reset),
        "show" | "" => Ok(ChatCommand::Show),
        "help" | "?" => Ok(ChatCommand::Help),
        "quit" | "exit" | "q" => Ok(ChatCommand::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

pub struct ChatSession<'a, T: CompareTransport + ?Sized> {
    flow: SubmissionFlow,
    transport: &'a T,
    locale: &'a Locale,
    theme: &'a Theme,
}

impl<'a, T: CompareTransport + ?Sized> ChatSession<'a, T> {
    pub fn new(transport: &'a T, locale: &'a Locale, theme: &'a Theme) -> Self {
        Self {
            flow: SubmissionFlow::new(),
            transport,
            locale,
            theme,
        }
    }

    pub fn flow(&self) -> &SubmissionFlow {
        &self.flow
    }

    pub fn render(&self) -> String {
        render_transcript(self.flow.state(), self.locale, self.theme)
    }

    /// Runs one command and returns the text to show. `None` ends the session.
    pub async fn handle(&mut self, command: ChatCommand) -> Option<String> {
        debug!(?command, "chat command");
        let output = match command {
            ChatCommand::Select { slot, path } => {
                let picked = pick_from_path(&path).await;
                match picked.and_then(|image| self.flow.select_image(slot, image)) {
                    Ok(()) => self.render(),
                    Err(err) => render_error(&err, self.locale, self.theme),
                }
            }
            ChatCommand::Compare => self.compare().await,
            ChatCommand::Reset => {
                self.flow.reset();
                self.render()
            }
            ChatCommand::Show => self.render(),
            ChatCommand::Help => HELP.to_string(),
            ChatCommand::Quit => return None,
        };
        Some(output)
    }

    async fn compare(&mut self) -> String {
        let pending = match self.flow.begin_submit() {
            Ok(pending) => pending,
            Err(err) => return render_error(&err, self.locale, self.theme),
        };
        println!("{}", self.render());

        let outcome = self
            .transport
            .send_pair(pending.first(), pending.second())
            .await
            .and_then(|reply| interpret_reply(&reply));

        match self.flow.finish_submit(pending, outcome) {
            Completion::Applied(result) => render_verdict(&result, self.locale, self.theme),
            Completion::Failed(err) => render_error(&err, self.locale, self.theme),
            Completion::Stale => self.render(),
        }
    }
}

pub async fn run<T: CompareTransport + ?Sized>(
    transport: &T,
    locale: &Locale,
    theme: &Theme,
) -> anyhow::Result<()> {
    let mut session = ChatSession::new(transport, locale, theme);
    println!("{}", session.render());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}\n{HELP}");
                continue;
            }
        };
        match session.handle(command).await {
            Some(output) => println!("{output}"),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::{error::SubmissionError, protocol::RawReply};

    struct FixedReply(RawReply);

    #[async_trait]
    impl CompareTransport for FixedReply {
        async fn send_pair(
            &self,
            _first: &shared::domain::SelectedImage,
            _second: &shared::domain::SelectedImage,
        ) -> Result<RawReply, SubmissionError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn parses_slot_commands_with_paths_containing_spaces() {
        assert_eq!(
            parse_command("2  ~/Pictures/my face.png "),
            Ok(ChatCommand::Select {
                slot: ImageSlot::Second,
                path: PathBuf::from("~/Pictures/my face.png"),
            })
        );
        assert_eq!(parse_command("COMPARE"), Ok(ChatCommand::Compare));
        assert_eq!(parse_command(""), Ok(ChatCommand::Show));
        assert!(parse_command("1").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[tokio::test]
    async fn compare_without_images_reports_validation_message() {
        let transport = FixedReply(RawReply::new(200, "{}"));
        let locale = Locale::default();
        let theme = Theme::plain();
        let mut session = ChatSession::new(&transport, &locale, &theme);

        let output = session
            .handle(ChatCommand::Compare)
            .await
            .expect("session continues");

        assert_eq!(output, "Error: Please select both images.");
    }

    #[tokio::test]
    async fn full_conversation_ends_with_verdict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("a.jpg");
        let second = dir.path().join("b.jpg");
        std::fs::write(&first, b"a").expect("write a");
        std::fs::write(&second, b"b").expect("write b");

        let transport = FixedReply(RawReply::new(
            200,
            r#"{"verified":true,"similarity_percentage":88.04,"distance":0.3,"threshold":0.4,"model":"ArcFace"}"#,
        ));
        let locale = Locale::default();
        let theme = Theme::plain();
        let mut session = ChatSession::new(&transport, &locale, &theme);

        session
            .handle(ChatCommand::Select {
                slot: ImageSlot::First,
                path: first,
            })
            .await
            .expect("select first");
        session
            .handle(ChatCommand::Select {
                slot: ImageSlot::Second,
                path: second,
            })
            .await
            .expect("select second");
        let output = session
            .handle(ChatCommand::Compare)
            .await
            .expect("compare");

        assert!(output.contains("Similarity: 88.0%"));
        assert!(output.contains("Model: ArcFace"));
        assert!(session.render().ends_with("[🔄 New Comparison]"));

        session.handle(ChatCommand::Reset).await.expect("reset");
        assert!(session.flow().state().first.is_none());
        assert_eq!(session.handle(ChatCommand::Quit).await, None);
    }

    #[tokio::test]
    async fn selecting_a_missing_file_keeps_the_flow_unchanged() {
        let transport = FixedReply(RawReply::new(200, "{}"));
        let locale = Locale::default();
        let theme = Theme::plain();
        let mut session = ChatSession::new(&transport, &locale, &theme);

        let output = session
            .handle(ChatCommand::Select {
                slot: ImageSlot::First,
                path: PathBuf::from("/definitely/not/here.jpg"),
            })
            .await
            .expect("session continues");

        assert!(output.starts_with("Error: Could not read image here.jpg"));
        assert!(session.flow().state().first.is_none());
    }
}
