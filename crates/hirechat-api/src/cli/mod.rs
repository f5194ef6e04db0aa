//! CLI command definitions and dispatch for the `hirechat` binary.
//!
//! Uses clap derive macros for argument parsing. Conversation commands act
//! on behalf of one user (`--as <user-id>` or `HIRECHAT_USER`), the way the
//! HTTP API acts on behalf of a session token.

pub mod conversation;
pub mod dev;
pub mod status;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use hirechat_types::conversation::ConversationId;
use hirechat_types::identity::{ApplicationId, ParticipantRole, UserId};

/// Employer/candidate messaging for job applications.
#[derive(Parser)]
#[command(name = "hirechat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Work with conversations as one participant.
    #[command(alias = "conv")]
    Conversation {
        /// User to act as.
        #[arg(long = "as", value_name = "USER_ID", env = "HIRECHAT_USER")]
        user: UserId,

        /// Role the client believes it holds. Display hint only.
        #[arg(long, value_name = "ROLE")]
        role_hint: Option<ParticipantRole>,

        #[command(subcommand)]
        action: ConversationCommand,
    },

    /// Seed collaborator data (applications, entitlements, session tokens)
    /// for local development.
    Dev {
        #[command(subcommand)]
        action: DevCommand,
    },

    /// System status dashboard.
    Status,

    /// Start the REST/WebSocket API server.
    Serve {
        /// Port to listen on (defaults to the config file's `server.port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the config file's `server.host`).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConversationCommand {
    /// Open (or reopen) the conversation for a job application.
    Open {
        application_id: ApplicationId,
    },

    /// Send a message.
    Send {
        conversation_id: ConversationId,

        /// Message text (1-4000 characters after trimming).
        body: String,
    },

    /// Show message history, oldest first.
    History {
        conversation_id: ConversationId,

        /// Only messages created at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Maximum number of messages.
        #[arg(long, short = 'n')]
        limit: Option<u32>,
    },

    /// Mark everything in a conversation as read.
    Read {
        conversation_id: ConversationId,
    },

    /// List conversations with unread counts, newest activity first.
    Inbox,

    /// Follow a conversation live until Ctrl+C, marking peer messages read.
    Watch {
        conversation_id: ConversationId,
    },
}

#[derive(Subcommand)]
pub enum DevCommand {
    /// Register a job application between an employer and a candidate.
    Application {
        /// Employer user ID (a new one is generated if omitted).
        #[arg(long)]
        employer: Option<UserId>,

        /// Candidate user ID (a new one is generated if omitted).
        #[arg(long)]
        candidate: Option<UserId>,
    },

    /// Grant an employer an active messaging entitlement.
    Entitle {
        employer: UserId,

        /// Days until the entitlement lapses.
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Issue a session token for a user.
    Token {
        user: UserId,

        /// Hours until the token expires.
        #[arg(long, default_value = "24")]
        hours: i64,
    },
}
