use std::sync::Arc;

use insurechat::config::EngineConfig;
use insurechat::engine::{self, EngineDeps};
use insurechat::flows;
use insurechat::i18n::Language;
use insurechat::sim::ThreadRandom;
use insurechat::step::StepId;
use insurechat::ui::{CliFrontend, Frontend, FrontendInput};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let entry: StepId = match std::env::var("INSURECHAT_ENTRY").as_deref() {
        Ok("service") => flows::post_payment::ENTRY,
        Ok("dashboard") => flows::dashboard::ENTRY,
        _ => flows::buy::ENTRY,
    };
    let language = match std::env::var("INSURECHAT_LANG").as_deref() {
        Ok("hi") => Language::Hi,
        _ => Language::En,
    };

    let registry = Arc::new(flows::registry()?);

    eprintln!("🛡  insurechat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Steps registered: {}", registry.len());
    eprintln!("   Entry: {entry}");
    eprintln!("   Commands: /edit <n> · /reset · /quit\n");

    let mut journey = engine::spawn(EngineDeps {
        registry,
        entry,
        config: EngineConfig::default(),
        random: Arc::new(ThreadRandom),
        language,
    })?;

    let frontend = CliFrontend::new();
    let handle = journey.handle.clone();
    let mut watch = handle.watch();

    loop {
        tokio::select! {
            summary = &mut journey.completion => {
                // Render whatever arrived with the final step first.
                frontend.render(&handle.view()).await;
                if let Ok(summary) = summary {
                    eprintln!("\n── journey complete: {} message(s) ──", summary.messages);
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nBye!");
                handle.shutdown().await.ok();
                break;
            }
            changed = watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = watch.borrow_and_update().clone();
                frontend.render(&view).await;
                if view.ended {
                    continue;
                }
                if view.widget.is_none() {
                    continue;
                }
                let mut leaving = false;
                loop {
                    match frontend.read_input(&view).await {
                        None => {
                            handle.shutdown().await.ok();
                            leaving = true;
                            break;
                        }
                        Some(FrontendInput::Response(response)) => {
                            match handle.submit(response).await {
                                Ok(()) => break,
                                // Boundary refusal: re-prompt instead of
                                // waiting on a view change that never comes.
                                Err(err) => eprintln!("  ✋ {err}"),
                            }
                        }
                        Some(FrontendInput::Edit(step)) => {
                            match handle.request_edit(step).await {
                                Ok(prompt) => {
                                    eprintln!("  Editing '{}':", prompt.step);
                                    let edit_view = insurechat::engine::EngineView {
                                        widget: Some(insurechat::engine::ActiveWidget {
                                            step: prompt.step,
                                            widget: prompt.widget,
                                            script: prompt.script,
                                            countdown_remaining: None,
                                        }),
                                        ..view.clone()
                                    };
                                    if let Some(FrontendInput::Response(response)) =
                                        frontend.read_input(&edit_view).await
                                    {
                                        if let Err(err) = handle.confirm_edit(step, response).await
                                        {
                                            eprintln!("  ✋ {err}");
                                            continue;
                                        }
                                    }
                                    break;
                                }
                                Err(err) => eprintln!("  ✋ {err}"),
                            }
                        }
                        Some(FrontendInput::Reset) => {
                            handle.reset().await.ok();
                            break;
                        }
                    }
                }
                if leaving {
                    break;
                }
            }
        }
    }

    Ok(())
}
