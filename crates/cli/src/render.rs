use colored::Colorize;
use uibuilder_core::{Message, Role, SessionSummary};

pub fn print_sessions(sessions: &[SessionSummary], current: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No sessions yet. Start one with /new.".bright_black());
        return;
    }

    for (index, session) in sessions.iter().enumerate() {
        let marker = if current == Some(session.id.as_str()) { "*" } else { " " };
        println!(
            "{} {:>3}  {}  {}  {}",
            marker.bright_green(),
            index + 1,
            session.id.bright_black(),
            session.title,
            session
                .updated_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black()
        );
    }
}

pub fn print_message(message: &Message) {
    let label = match message.role {
        Role::User => "you".bright_cyan().bold(),
        Role::Assistant => "builder".bright_magenta().bold(),
    };
    let pending = if message.is_optimistic() {
        " (sending)".bright_black().to_string()
    } else {
        String::new()
    };
    println!("{}{}", label, pending);

    for line in message.content.lines() {
        println!("  {}", line);
    }

    let blocks = message.effective_code_blocks();
    if !blocks.is_empty() {
        let names: Vec<&str> = blocks.iter().map(|b| b.filename.as_str()).collect();
        println!("  {} {}", "files:".bright_black(), names.join(", ").green());
    }
    println!();
}

pub fn print_questions(questions: &[String]) {
    if questions.is_empty() {
        return;
    }

    println!("{}", "The builder needs more detail:".bright_yellow());
    for (index, question) in questions.iter().enumerate() {
        println!("  {}. {}", index + 1, question);
    }
    println!("{}", "Answer with /answer <n> or type a reply.".bright_black());
    println!();
}

pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

pub fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /new               start a new session");
    println!("  /sessions          list sessions");
    println!("  /switch <id|n>     open a session by id or list number");
    println!("  /delete <id|n>     delete a session");
    println!("  /refresh           reload messages of the open session");
    println!("  /answer <n>        send follow-up question n as your reply");
    println!("  /export [dir]      write generated files of the open session");
    println!("  /help              show this help");
    println!("  /quit              exit");
    println!("{}", "Anything else is sent to the builder.".bright_black());
}
