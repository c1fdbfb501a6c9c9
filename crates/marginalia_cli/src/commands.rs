use crate::cli::{AnnotationCommand, Cli, Command, EntryCommand};
use crate::config::CliConfig;
use log::info;
use marginalia_core::{
    core_version, ping, AnnotationDraft, AnnotationRepository, Coordinator, CoreError,
    EntryDraft, EntryRepository, Operation, StoreError,
};
use serde::Serialize;
use serde_json::json;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Store(StoreError),
    Core(CoreError),
    Output(serde_json::Error),
}

impl CliError {
    /// Short tag printed as `error=<kind>`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Store(_) => "store_open",
            Self::Core(err) => err.kind().as_str(),
            Self::Output(_) => "output",
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Core(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to render output: {err}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

/// Runs one command and returns the JSON to print.
pub fn run(cli: Cli) -> Result<String, CliError> {
    let operation = match cli.command {
        Command::Ping => return render(&json!({ "ping": ping() })),
        Command::Version => return render(&json!({ "version": core_version() })),
        Command::Entry(command) => entry_operation(command),
        Command::Annotation(command) => annotation_operation(command),
    };

    let config = CliConfig::resolve(&cli.global);
    config.init_logging().map_err(CliError::Config)?;
    let store = config.open_store()?;
    execute(&Coordinator::over_store(Arc::new(store)), operation)
}

/// Dispatches `operation` and renders the outcome.
pub fn execute<E, A>(coordinator: &Coordinator<E, A>, operation: Operation) -> Result<String, CliError>
where
    E: EntryRepository,
    A: AnnotationRepository,
{
    let name = operation.name();
    let reply = coordinator.dispatch(operation)?;
    info!(
        "event=cli_command module=cli status=ok operation={name} status_code={}",
        reply.status_code()
    );
    render(&reply.outcome)
}

pub fn entry_operation(command: EntryCommand) -> Operation {
    match command {
        EntryCommand::Create { assign_id, body } => Operation::CreateEntry(EntryDraft {
            id: assign_id,
            title: body.title,
            content: body.content,
        }),
        EntryCommand::Get { id } => Operation::GetEntry(id),
        EntryCommand::List => Operation::ListEntries,
        EntryCommand::Update { id, body } => Operation::UpdateEntry {
            id,
            draft: EntryDraft {
                id: None,
                title: body.title,
                content: body.content,
            },
        },
        EntryCommand::Delete { id } => Operation::DeleteEntry(id),
    }
}

pub fn annotation_operation(command: AnnotationCommand) -> Operation {
    match command {
        AnnotationCommand::Create {
            entry_id,
            assign_id,
            body,
        } => Operation::CreateAnnotation {
            parent_id: entry_id,
            draft: AnnotationDraft {
                id: assign_id,
                parent_id: body.parent_id,
                author: body.author,
                content: body.content,
            },
        },
        AnnotationCommand::Get { entry_id, id } => Operation::GetAnnotation {
            parent_id: entry_id,
            id,
        },
        AnnotationCommand::List {
            entry_id: Some(entry_id),
            ..
        } => Operation::ListAnnotations {
            parent_id: entry_id,
        },
        AnnotationCommand::List { entry_id: None, .. } => Operation::ListAllAnnotations,
        AnnotationCommand::Update { entry_id, id, body } => Operation::UpdateAnnotation {
            parent_id: entry_id,
            id,
            draft: AnnotationDraft {
                id: None,
                parent_id: body.parent_id,
                author: body.author,
                content: body.content,
            },
        },
        AnnotationCommand::Delete { entry_id, id } => Operation::DeleteAnnotation {
            parent_id: entry_id,
            id,
        },
        AnnotationCommand::Purge { entry_id } => Operation::DeleteAnnotations {
            parent_id: entry_id,
        },
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}
