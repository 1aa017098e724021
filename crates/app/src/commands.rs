use std::error::Error;
use std::io::Write;

use quiz_core::model::{
    ChoiceId, GenerationStatus, PracticeResults, PracticeSession, Question, QuestionSetId, UserId,
    choice_label,
};
use services::{AppServices, PracticeAction, PracticeOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Command;

type CommandResult = Result<(), Box<dyn Error>>;

pub(crate) async fn execute(app: &AppServices, user_id: UserId, command: Command) -> CommandResult {
    match command {
        Command::Generate { prompt, count } => generate(app, user_id, &prompt, count).await,
        Command::Sets => list_sets(app, user_id).await,
        Command::Show(id) => show(app, user_id, id).await,
        Command::Status(id) => {
            let status = app.question_sets().status(user_id, id).await?;
            if status.is_terminal() {
                println!("{status}");
            } else {
                println!("{status} (still generating)");
            }
            Ok(())
        }
        Command::Practice(id) => practice(app, user_id, id).await,
        Command::Results(set_id, session_id) => {
            let practice = app.practice();
            let session = practice.session(user_id, set_id, session_id).await?;
            print_results(&practice.results(user_id, &session).await?);
            Ok(())
        }
        Command::Stats => {
            let stats = app.stats().dashboard(user_id).await?;
            println!("questions:     {}", stats.questions_count);
            println!("practices:     {}", stats.practices_count);
            println!("practice time: {}", format_duration(stats.practice_time));
            Ok(())
        }
        Command::Delete(id) => {
            app.question_sets().delete(user_id, id).await?;
            println!("deleted question set {id}");
            Ok(())
        }
        Command::Pin(id) => {
            app.question_sets().pin(user_id, id).await?;
            println!("pinned question set {id}");
            Ok(())
        }
        Command::Unpin(id) => {
            app.question_sets().unpin(user_id, id).await?;
            println!("unpinned question set {id}");
            Ok(())
        }
    }
}

async fn generate(app: &AppServices, user_id: UserId, prompt: &str, count: Option<u8>) -> CommandResult {
    let ticket = app
        .question_sets()
        .request_generation(user_id, prompt, count)
        .await?;
    let id = ticket.question_set.id;
    println!("generating question set {id}...");

    // The runtime stops with the process, so wait for the background task here.
    match ticket.wait().await {
        GenerationStatus::Success => {
            println!("question set {id} is ready; run `practice {id}` to start");
        }
        status => println!("question set {id} finished with status {status}"),
    }
    Ok(())
}

async fn list_sets(app: &AppServices, user_id: UserId) -> CommandResult {
    let sets = app.question_sets().list(user_id).await?;
    if sets.is_empty() {
        println!("no question sets yet");
        return Ok(());
    }
    for set in sets {
        let pin = if set.is_pinned() { '*' } else { ' ' };
        println!("{pin} {:>5}  {:<8} {}", set.id, set.status, set.title);
    }
    Ok(())
}

async fn show(app: &AppServices, user_id: UserId, id: QuestionSetId) -> CommandResult {
    let detail = app.question_sets().get(user_id, id).await?;
    let set = &detail.question_set;
    println!("{} [{}]", set.title, set.status);
    if let Some(description) = &set.description {
        println!("{description}");
    }
    println!("prompt: {}", set.prompt);
    if let Some(model) = &set.model {
        println!("model:  {model}");
    }
    for (n, question) in detail.questions.iter().enumerate() {
        println!();
        println!("{}. {}", n + 1, question.text);
        for (i, choice) in question.choices.iter().enumerate() {
            let mark = if choice.is_correct { '*' } else { ' ' };
            println!("  {mark} {}) {}", label(i), choice.text);
        }
        if !question.explanation.is_empty() {
            println!("    {}", question.explanation);
        }
    }
    Ok(())
}

async fn practice(app: &AppServices, user_id: UserId, set_id: QuestionSetId) -> CommandResult {
    let practice = app.practice();
    let mut session = practice.start_or_resume(user_id, set_id).await?;
    println!("practice session {} ({} questions)", session.id(), session.total_questions());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !session.is_finished() {
        let question = practice.current_question(user_id, &session).await?;
        let selected = practice
            .answers(user_id, &session)
            .await?
            .into_iter()
            .find(|a| a.question_id == question.id)
            .map(|a| a.choice_id);
        print_question(&session, &question, selected, practice.progress(&session).percent);

        print!("answer letter, (n)ext, (p)revious, (f)inish or (q)uit: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim().to_ascii_lowercase();
        let (choice, action) = match input.as_str() {
            "q" => break,
            "" | "n" => (None, PracticeAction::Next),
            "p" => (None, PracticeAction::Previous),
            "f" => (None, PracticeAction::Finish),
            other => match choice_for_input(other, &question) {
                Some(choice) => (Some(choice), PracticeAction::Next),
                None => {
                    println!("unrecognized input: {other}");
                    continue;
                }
            },
        };

        match practice
            .respond(user_id, &mut session, question.id, choice, action)
            .await?
        {
            PracticeOutcome::Moved { .. } => {}
            PracticeOutcome::Incomplete { index } => {
                println!("question {} still needs an answer", index + 1);
            }
            PracticeOutcome::Finished => {
                println!();
                print_results(&practice.results(user_id, &session).await?);
            }
        }
    }

    if !session.is_finished() {
        println!("progress saved; run `practice {set_id}` to continue");
    }
    Ok(())
}

fn print_question(
    session: &PracticeSession,
    question: &Question,
    selected: Option<ChoiceId>,
    percent: u8,
) {
    println!();
    println!(
        "[{}/{}] {percent}%",
        session.current_index() + 1,
        session.total_questions()
    );
    println!("{}", question.text);
    for (i, choice) in question.choices.iter().enumerate() {
        let marker = if Some(choice.id) == selected { '>' } else { ' ' };
        println!(" {marker} {}) {}", label(i), choice.text);
    }
}

fn choice_for_input(input: &str, question: &Question) -> Option<ChoiceId> {
    let mut chars = input.chars();
    let letter = chars.next().filter(|_| chars.next().is_none())?;
    question
        .choices
        .iter()
        .enumerate()
        .find(|(i, _)| choice_label(*i).is_some_and(|l| l.eq_ignore_ascii_case(&letter)))
        .map(|(_, choice)| choice.id)
}

fn print_results(results: &PracticeResults) {
    println!(
        "score: {}/{} ({:.0}%) in {}",
        results.correct_count,
        results.total_count,
        results.percent,
        format_duration(results.duration)
    );
    for (n, answered) in results.answers.iter().enumerate() {
        let verdict = if answered.is_correct { "right" } else { "wrong" };
        println!();
        println!("{}. [{verdict}] {}", n + 1, answered.question.text);
        println!("   your answer: {}", answered.selected_choice.text);
        if !answered.is_correct {
            if let Some(correct) = answered.question.correct_choice() {
                println!("   correct:     {}", correct.text);
            }
        }
        if !answered.question.explanation.is_empty() {
            println!("   {}", answered.question.explanation);
        }
    }
}

fn label(index: usize) -> char {
    choice_label(index).unwrap_or('?')
}

fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Choice, QuestionId};

    fn question() -> Question {
        Question {
            id: QuestionId::new(1),
            question_set_id: QuestionSetId::new(1),
            text: "Pick one".into(),
            explanation: String::new(),
            choices: (1..=3)
                .map(|id| Choice {
                    id: ChoiceId::new(id * 10),
                    text: format!("choice {id}"),
                    is_correct: id == 2,
                })
                .collect(),
        }
    }

    #[test]
    fn letters_map_to_choice_ids() {
        let q = question();
        assert_eq!(choice_for_input("a", &q), Some(ChoiceId::new(10)));
        assert_eq!(choice_for_input("C", &q), Some(ChoiceId::new(30)));
        assert_eq!(choice_for_input("d", &q), None);
        assert_eq!(choice_for_input("ab", &q), None);
    }

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(chrono::Duration::seconds(9)), "9s");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 05s");
        assert_eq!(format_duration(chrono::Duration::seconds(3725)), "1h 02m 05s");
    }
}
