//! CLI frontend — a stdin/stdout chat surface for local runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::engine::{ActiveWidget, EngineView};
use crate::state::Sender;
use crate::step::{UserResponse, WidgetType};
use crate::ui::{Frontend, FrontendInput};

/// Renders the transcript to stdout and reads answers from stdin.
///
/// Commands: `/edit <n>` rewinds to the step behind message `n`,
/// `/reset` restarts the journey, `/quit` leaves.
pub struct CliFrontend {
    printed: Mutex<usize>,
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl CliFrontend {
    pub fn new() -> Self {
        Self {
            printed: Mutex::new(0),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn read_line(&self) -> Option<String> {
        let mut lines = self.lines.lock().await;
        lines.next_line().await.ok().flatten()
    }

    fn print_widget(widget: &ActiveWidget) {
        let script = &widget.script;
        match widget.widget {
            WidgetType::SingleSelect | WidgetType::MultiSelect => {
                for (i, choice) in script.options.iter().enumerate() {
                    let marker = if choice.disabled { "✗" } else { " " };
                    match &choice.sublabel {
                        Some(sub) => eprintln!("  {marker}[{}] {} — {sub}", i + 1, choice.label),
                        None => eprintln!("  {marker}[{}] {}", i + 1, choice.label),
                    }
                }
                if widget.widget == WidgetType::MultiSelect {
                    eprintln!("  (comma-separated numbers, or press Enter for none)");
                }
            }
            WidgetType::Otp => {
                let len = script.otp_len.unwrap_or(6);
                match widget.countdown_remaining {
                    Some(secs) => eprintln!("  ({len}-digit code · resend in {secs}s)"),
                    None => eprintln!("  ({len}-digit code)"),
                }
            }
            WidgetType::Date => eprintln!("  (YYYY-MM-DD)"),
            WidgetType::Summary => eprintln!("  (press Enter to continue)"),
            WidgetType::Upload => eprintln!("  (type a file name, e.g. statement.pdf)"),
            _ => {
                if let Some(placeholder) = &script.placeholder {
                    eprintln!("  ({placeholder})");
                }
            }
        }
    }

    fn parse_response(widget: &ActiveWidget, line: &str) -> Option<UserResponse> {
        let line = line.trim();
        let script = &widget.script;
        match widget.widget {
            WidgetType::Text => Some(UserResponse::Text(line.to_string())),
            WidgetType::Number => line.parse::<i64>().ok().map(UserResponse::Number),
            WidgetType::Amount => line
                .replace([',', '₹'], "")
                .parse::<Decimal>()
                .ok()
                .map(UserResponse::Amount),
            WidgetType::Date => NaiveDate::parse_from_str(line, "%Y-%m-%d")
                .ok()
                .map(UserResponse::Date),
            WidgetType::SingleSelect => {
                let index: usize = line.parse().ok()?;
                script
                    .options
                    .get(index.checked_sub(1)?)
                    .map(|c| UserResponse::Select(c.id.clone()))
            }
            WidgetType::MultiSelect => {
                if line.is_empty() {
                    return Some(UserResponse::Multi(Vec::new()));
                }
                let mut ids = Vec::new();
                for part in line.split(',') {
                    let index: usize = part.trim().parse().ok()?;
                    ids.push(script.options.get(index.checked_sub(1)?)?.id.clone());
                }
                Some(UserResponse::Multi(ids))
            }
            WidgetType::Otp => Some(UserResponse::Otp(line.to_string())),
            WidgetType::Summary => Some(UserResponse::Ack),
            WidgetType::Upload => {
                let name = if line.is_empty() { "document.pdf" } else { line };
                Some(UserResponse::Upload(name.to_string()))
            }
            WidgetType::NoInput => None,
        }
    }
}

impl Default for CliFrontend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Frontend for CliFrontend {
    async fn render(&self, view: &EngineView) {
        let mut printed = self.printed.lock().await;
        if view.messages.len() < *printed {
            // History shrank: a rewind or reset happened.
            println!("\n──── conversation rewound ────");
            *printed = 0;
        }
        for (i, msg) in view.messages.iter().enumerate().skip(*printed) {
            match msg.sender {
                Sender::Bot => println!("\n🤖 {}", msg.text),
                Sender::User => println!("   You [{}]: {}", i + 1, msg.text),
            }
        }
        *printed = view.messages.len();

        if let Some(fault) = &view.fault {
            println!("\n⚠️  Something broke on our side: {fault}");
            println!("    Type /reset to start over.");
        }
    }

    async fn read_input(&self, view: &EngineView) -> Option<FrontendInput> {
        let widget = view.widget.as_ref()?;
        Self::print_widget(widget);
        loop {
            eprint!("> ");
            let line = self.read_line().await?;
            let trimmed = line.trim();

            if trimmed == "/quit" || trimmed == "/exit" {
                return None;
            }
            if trimmed == "/reset" {
                return Some(FrontendInput::Reset);
            }
            if let Some(arg) = trimmed.strip_prefix("/edit ") {
                let Some(index) = arg.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1))
                else {
                    eprintln!("  Usage: /edit <message number>");
                    continue;
                };
                match view.messages.get(index) {
                    Some(msg) if msg.editable => return Some(FrontendInput::Edit(msg.step)),
                    _ => {
                        eprintln!("  That message can't be edited.");
                        continue;
                    }
                }
            }

            match Self::parse_response(widget, &line) {
                Some(response) => return Some(FrontendInput::Response(response)),
                None => eprintln!("  Couldn't read that — try again."),
            }
        }
    }
}
