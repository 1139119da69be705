use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AddTodoAction, FormData, HttpTodoApi, LifecycleCallbacks, SubmissionController,
    SubmissionSnapshot, TodoApi,
};
use shared::{
    domain::{Todo, TodoId, TodoStatus, TodoUpdateInput},
    protocol::ListTodosQuery,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Manage todos on a todo API server")]
struct Args {
    #[arg(long, env = "TODO_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit the add-todo form.
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 timestamp, e.g. 2026-11-01T09:00:00Z
        #[arg(long)]
        due: Option<String>,
    },
    List {
        #[arg(long)]
        status: Option<TodoStatus>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Done {
        id: String,
    },
    Rm {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let api = HttpTodoApi::connect(&args.api_url)?;
    debug!(api_url = %api.transport().base_url(), "using todo API");

    match args.command {
        Command::Add {
            title,
            description,
            due,
        } => add(api, add_form(&title, description.as_deref(), due.as_deref())).await,
        Command::List { status, limit } => {
            let response = api.list_todos(&ListTodosQuery { status, limit }).await?;
            if response.items.is_empty() {
                println!("No todos.");
            }
            for todo in &response.items {
                println!("{}", format_todo(todo));
            }
            Ok(())
        }
        Command::Done { id } => {
            let todo = api
                .update_todo(
                    &TodoId(id),
                    &TodoUpdateInput {
                        status: Some(TodoStatus::Done),
                        ..TodoUpdateInput::default()
                    },
                )
                .await?;
            println!("{}", format_todo(&todo));
            Ok(())
        }
        Command::Rm { id } => {
            api.delete_todo(&TodoId(id.clone())).await?;
            println!("Deleted {id}");
            Ok(())
        }
    }
}

/// Mirrors what a browser submits: every input present, empty when unset.
fn add_form(title: &str, description: Option<&str>, due: Option<&str>) -> FormData {
    let mut form = FormData::new();
    form.append("title", title);
    form.append("description", description.unwrap_or_default());
    if let Some(due) = due {
        form.append("dueDate", due);
    }
    form
}

async fn add(api: HttpTodoApi, form: FormData) -> Result<()> {
    let callbacks = LifecycleCallbacks::new()
        .on_pending(|| eprintln!("Saving..."))
        .on_success(|| println!("Success: todo created"))
        .on_error(|error| eprintln!("Error: {}", error.message));
    let mut controller = SubmissionController::bind(AddTodoAction::new(api), callbacks);

    controller.trigger(form);
    let snapshot = loop {
        let snapshot = controller.render();
        if !snapshot.is_pending {
            break snapshot;
        }
        controller.changed().await;
    };

    report_field_errors(&snapshot);
    if !snapshot.data.is_ok() {
        bail!("todo was not created");
    }
    Ok(())
}

fn report_field_errors(snapshot: &SubmissionSnapshot) {
    let Some(error) = &snapshot.error else {
        return;
    };
    if error.errors.len() < 2 {
        return;
    }
    for (path, message) in error.errors.iter() {
        eprintln!("  {path}: {message}");
    }
}

fn format_todo(todo: &Todo) -> String {
    let mut line = format!("{}  [{}]  {}", todo.id, todo.status, todo.title);
    if let Some(due) = todo.due_date {
        line.push_str(&format!("  (due {})", due.format("%Y-%m-%d %H:%M")));
    }
    if let Some(description) = todo.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!("\n    {description}"));
    }
    line
}
