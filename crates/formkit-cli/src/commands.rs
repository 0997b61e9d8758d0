//! Subcommand implementations

use crate::prompt::Prompter;
use anyhow::{bail, Context};
use formkit_client::{ClientConfig, FormService, HttpFormService, PageRequest};
use formkit_core::{Field, FieldKind, FieldType, Form, IdGenerator, UuidGenerator};
use formkit_runtime::{
    AdvanceOutcome, AutosaveConfig, BuilderController, ClientStore, Completion, FileStore,
    MemoryStore, ResumeChoice, ResumeDecision, SaveOutcome, SubmissionResolver, SubmissionSession,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Shared handles for one invocation
pub(crate) struct App {
    config: ClientConfig,
    service: Arc<dyn FormService>,
    store: Arc<dyn ClientStore>,
    ids: Arc<dyn IdGenerator>,
}

impl App {
    pub(crate) fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let service = HttpFormService::new(&config).context("building HTTP client")?;
        let store: Arc<dyn ClientStore> = match &config.storage_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => {
                tracing::warn!("no storage_path configured; saved progress is kept for this run only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self {
            config,
            service: Arc::new(service),
            store,
            ids: Arc::new(UuidGenerator::new()),
        })
    }

    pub(crate) async fn show(&self, form_id: &str, json: bool) -> anyhow::Result<()> {
        let form = self.service.get_form(form_id, true).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&form)?);
        } else {
            print!("{}", describe_form(&form));
        }
        Ok(())
    }

    pub(crate) async fn list(&self, page: PageRequest) -> anyhow::Result<()> {
        let forms = self.service.list_forms(page).await?;
        if forms.is_empty() {
            println!("No forms.");
        }
        for form in forms {
            println!("{}\t{}\t{}", form.form_id, form.status, form.name);
        }
        Ok(())
    }

    pub(crate) async fn create(&self, name: &str) -> anyhow::Result<()> {
        let mut form = Form::new(String::new(), "Untitled form", self.ids.as_ref());
        form.rename(name)?;
        let form_id = self.service.create_form(&form).await?;
        println!("{form_id}");
        Ok(())
    }

    pub(crate) async fn delete(&self, form_id: &str) -> anyhow::Result<()> {
        self.service.delete_form(form_id).await?;
        println!("Deleted {form_id}");
        Ok(())
    }

    async fn builder(&self, form_id: &str) -> anyhow::Result<BuilderController> {
        let builder = BuilderController::load(
            form_id,
            Arc::clone(&self.service),
            Arc::clone(&self.ids),
            AutosaveConfig::from(&self.config),
        )
        .await
        .with_context(|| format!("loading form {form_id}"))?;
        Ok(builder)
    }

    pub(crate) async fn rename(&self, form_id: &str, name: &str) -> anyhow::Result<()> {
        let builder = self.builder(form_id).await?;
        builder.edit(|form| form.rename(name))?;
        finish(&builder).await
    }

    pub(crate) async fn add_card(&self, form_id: &str, title: &str) -> anyhow::Result<()> {
        let builder = self.builder(form_id).await?;
        let card_id = builder.add_card(title);
        finish(&builder).await?;
        println!("{card_id}");
        Ok(())
    }

    pub(crate) async fn add_field(
        &self,
        form_id: &str,
        card_id: &str,
        field_type: FieldType,
        label: &str,
        required: bool,
    ) -> anyhow::Result<()> {
        let builder = self.builder(form_id).await?;
        let field_id = builder.add_field(card_id, field_type)?;
        builder.edit(|form| {
            form.set_label(&field_id, label)?;
            form.set_required(&field_id, required)
        })?;
        finish(&builder).await?;
        println!("{field_id}");
        Ok(())
    }

    pub(crate) async fn responses(&self, form_id: &str, page: PageRequest) -> anyhow::Result<()> {
        let records = self.service.list_submissions(form_id, page).await?;
        if records.is_empty() {
            println!("No responses.");
        }
        for record in records {
            let id = record.submission_id.as_deref().unwrap_or("-");
            let when = record
                .created_at
                .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
            println!("{id}\t{when}");
            for (field_id, value) in record.values.iter() {
                println!("  {field_id}: {value}");
            }
        }
        Ok(())
    }

    pub(crate) async fn fill(&self, form_id: &str) -> anyhow::Result<()> {
        let form = self.service.get_form(form_id, false).await?;
        let resolver = SubmissionResolver::new(
            Arc::clone(&self.service),
            Arc::clone(&self.store),
            Arc::clone(&self.ids),
        );
        let mut prompter = Prompter::stdio();

        let start = match resolver.begin(&form).await {
            ResumeDecision::Ready(start) => start,
            ResumeDecision::ChoiceRequired(pending) => {
                let Some(choice) = ask_resume_choice(&mut prompter).await? else {
                    return Ok(());
                };
                resolver.choose(pending, choice)
            }
        };

        let mut session = SubmissionSession::start(
            Arc::new(form),
            start,
            Arc::clone(&self.service),
            Arc::clone(&self.store),
        )?;
        match fill_session(&mut session, &mut prompter).await? {
            Some(completion) => {
                prompter.say("Thank you! Your response was recorded.").await?;
                tracing::info!(path = %completion.redirect.path(), "submission complete");
            }
            None => {
                session.close().await;
                prompter.say("\nProgress saved. Run `fill` again to continue.").await?;
            }
        }
        Ok(())
    }
}

async fn finish(builder: &BuilderController) -> anyhow::Result<()> {
    let outcome = builder.flush().await;
    builder.close();
    match outcome {
        SaveOutcome::Saved => println!("Saved."),
        SaveOutcome::Clean => println!("No changes."),
        SaveOutcome::Failed(e) => return Err(e).context("saving form"),
        SaveOutcome::InFlight | SaveOutcome::Closed => bail!("form was not saved"),
    }
    Ok(())
}

fn describe_form(form: &Form) -> String {
    let mut out = format!("{} ({}) [{}]\n", form.name, form.form_id, form.status);
    if let Some(description) = &form.description {
        out.push_str(&format!("  {description}\n"));
    }
    for (index, card) in form.cards.iter().enumerate() {
        out.push_str(&format!("\n{}. {} ({})\n", index + 1, card.title, card.card_id));
        for field in &card.fields {
            let marker = if field.required { " *" } else { "" };
            out.push_str(&format!(
                "   - {}{} [{}] ({})\n",
                field.label,
                marker,
                field.field_type(),
                field.field_id
            ));
            if let Some(options) = field.options() {
                for option in options {
                    out.push_str(&format!("       o {option}\n"));
                }
            }
        }
    }
    out
}

async fn ask_resume_choice<R, W>(prompter: &mut Prompter<R, W>) -> anyhow::Result<Option<ResumeChoice>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let Some(answer) = prompter
            .ask("You have an unfinished response. [c]ontinue it or start [n]ew? ")
            .await?
        else {
            return Ok(None);
        };
        match answer.to_ascii_lowercase().as_str() {
            "c" | "continue" => return Ok(Some(ResumeChoice::ContinuePrevious)),
            "n" | "new" => return Ok(Some(ResumeChoice::StartNew)),
            _ => prompter.say("Please answer c or n.").await?,
        }
    }
}

fn field_prompt(field: &Field, current: Option<&str>) -> String {
    let marker = if field.required { " *" } else { "" };
    let mut prompt = format!("{}{}", field.label, marker);
    if let Some(options) = field.options() {
        let listed: Vec<String> = options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {o}", i + 1))
            .collect();
        prompt.push_str(&format!(" [{}]", listed.join(", ")));
    }
    if let Some(current) = current.filter(|c| !c.is_empty()) {
        prompt.push_str(&format!(" ({current})"));
    }
    prompt.push_str(": ");
    prompt
}

fn resolve_option<'a>(options: &'a [String], token: &str) -> Option<&'a str> {
    let token = token.trim();
    if let Ok(n) = token.parse::<usize>() {
        return options.get(n.checked_sub(1)?).map(String::as_str);
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(token))
        .map(String::as_str)
}

/// Store one typed answer; `false` if it names no valid option
fn apply_input(session: &mut SubmissionSession, field: &Field, input: &str) -> anyhow::Result<bool> {
    match &field.kind {
        FieldKind::MultipleChoice { options } => match resolve_option(options, input) {
            Some(option) => session.handle_change(&field.field_id, option)?,
            None => return Ok(false),
        },
        FieldKind::MultipleSelect { options } => {
            let picked: Option<Vec<&str>> = input
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(|t| resolve_option(options, t))
                .collect();
            match picked {
                Some(picked) => session.set_selection(&field.field_id, &picked)?,
                None => return Ok(false),
            }
        }
        _ => session.handle_change(&field.field_id, input)?,
    }
    Ok(true)
}

/// Walk the cards until submitted; `None` if input ends first
///
/// At any prompt, an empty line keeps the current answer and `<` goes back
/// one card.
pub(crate) async fn fill_session<R, W>(
    session: &mut SubmissionSession,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Option<Completion>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let card = session.current_card().clone();
        prompter
            .say(&format!(
                "\n[{}/{}] {}",
                session.current_index() + 1,
                session.total_cards(),
                card.title
            ))
            .await?;
        if let Some(description) = &card.description {
            prompter.say(description).await?;
        }

        let mut back = false;
        for field in &card.fields {
            if !field.collects_answer() {
                prompter.say(&field.label).await?;
                continue;
            }
            if let Some(error) = session.error(&field.field_id) {
                prompter.say(&format!("  ! {error}")).await?;
            }
            loop {
                let prompt = field_prompt(field, session.answers().get(&field.field_id));
                let Some(input) = prompter.ask(&prompt).await? else {
                    return Ok(None);
                };
                if input == "<" {
                    back = true;
                    break;
                }
                if input.is_empty() || apply_input(session, field, &input)? {
                    break;
                }
                prompter.say("  Not one of the options.").await?;
            }
            if back {
                break;
            }
        }

        if back {
            session.retreat_card()?;
            continue;
        }
        if !session.is_last_card() {
            if let AdvanceOutcome::Blocked { .. } = session.advance_card()? {
                prompter.say("Please fill in the required fields.").await?;
            }
            continue;
        }

        match session.submit().await {
            Ok(completion) => return Ok(Some(completion)),
            Err(e) if e.is_validation() => {
                prompter.say(e.alert_message()).await?;
                while session.current_index() > 0
                    && !session
                        .current_card()
                        .fields
                        .iter()
                        .any(|f| session.error(&f.field_id).is_some())
                {
                    session.retreat_card()?;
                }
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "submit failed");
                prompter.say(e.alert_message()).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
