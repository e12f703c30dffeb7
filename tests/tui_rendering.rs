// Full-screen rendering checks against ratatui's TestBackend.

use ratatui::Terminal;
use ratatui::backend::TestBackend;

use pd_assist::app::{App, DrugPopup, FocusPane};
use pd_assist::client::{ChatClient, DrugInfo};
use pd_assist::highlight::Highlighter;
use pd_assist::state::CatalogEntry;
use pd_assist::ui;
use pd_assist::view::ExchangeOutcome;

fn row_text(terminal: &Terminal<TestBackend>, y: u16) -> String {
    let buf = terminal.backend().buffer();
    let width = buf.area.width;
    (0..width)
        .map(|x| {
            buf.cell((x, y))
                .map(|c| c.symbol().chars().next().unwrap_or(' '))
                .unwrap_or(' ')
        })
        .collect()
}

fn all_text(terminal: &Terminal<TestBackend>) -> String {
    let buf = terminal.backend().buffer();
    let height = buf.area.height;
    (0..height)
        .map(|y| row_text(terminal, y))
        .collect::<Vec<_>>()
        .join("\n")
}

fn new_app() -> App {
    App::new(
        ChatClient::new("http://127.0.0.1:9").unwrap(),
        Highlighter::builtin().unwrap(),
        std::env::temp_dir(),
    )
}

fn draw(terminal: &mut Terminal<TestBackend>, app: &mut App) {
    terminal.draw(|frame| ui::render(app, frame)).unwrap();
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.view.input.insert(c);
    }
}

#[test]
fn renders_welcome_panel_on_start() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();

    draw(&mut terminal, &mut app);

    let header = row_text(&terminal, 0);
    assert!(header.contains("PD TreatmentAssist"), "got: {header:?}");
    let text = all_text(&terminal);
    assert!(text.contains("Welcome to PD TreatmentAssist"), "got:\n{text}");
    assert!(text.contains("No medications loaded"), "got:\n{text}");
}

#[test]
fn renders_user_message_and_typing_indicator() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();

    type_text(&mut app, "Is nausea common?");
    assert!(app.view.submit().is_some());
    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("You:"), "got:\n{text}");
    assert!(text.contains("Is nausea common?"), "got:\n{text}");
    assert!(text.contains("Typing."), "got:\n{text}");
    assert!(text.contains("Waiting for response"), "got:\n{text}");
    assert!(!text.contains("Welcome to PD TreatmentAssist"), "got:\n{text}");
}

#[test]
fn renders_bot_reply_without_typing_indicator() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();

    type_text(&mut app, "What about hallucinations?");
    app.view.submit();
    let highlighter = app.highlighter.clone();
    assert!(app.view.settle(
        ExchangeOutcome::Response("<h3>Levodopa</h3><p>Hallucinations are rare.</p>".to_string()),
        &highlighter,
    ));
    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("Assistant:"), "got:\n{text}");
    assert!(text.contains("Hallucinations are rare."), "got:\n{text}");
    assert!(!text.contains("Typing"), "got:\n{text}");
}

#[test]
fn renders_error_bubble_after_failure() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();

    type_text(&mut app, "hello");
    app.view.submit();
    let highlighter = app.highlighter.clone();
    app.view.settle(ExchangeOutcome::Failed, &highlighter);
    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("Error"), "got:\n{text}");
    assert!(text.contains("I apologize"), "got:\n{text}");
}

#[test]
fn reset_restores_welcome_panel() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();

    type_text(&mut app, "hello");
    app.view.submit();
    draw(&mut terminal, &mut app);
    assert!(!all_text(&terminal).contains("Welcome to PD TreatmentAssist"));

    app.reset();
    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("Welcome to PD TreatmentAssist"), "got:\n{text}");
    assert!(!text.contains("Typing"), "got:\n{text}");
}

#[test]
fn renders_catalog_and_drug_popup() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();
    app.set_catalog(vec![
        CatalogEntry {
            name: "Levodopa".to_string(),
        },
        CatalogEntry {
            name: "Rasagiline".to_string(),
        },
    ]);
    app.focus = FocusPane::Catalog;

    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("Medications"), "got:\n{text}");
    assert!(text.contains("Levodopa"), "got:\n{text}");
    assert!(text.contains("Rasagiline"), "got:\n{text}");

    app.drug_popup = Some(DrugPopup::Loaded(DrugInfo {
        name: "Rasagiline".to_string(),
        common_side_effects: vec!["Headache".to_string()],
        severe_side_effects: vec!["Serotonin syndrome".to_string()],
        resources: Vec::new(),
        case_studies: Vec::new(),
    }));

    draw(&mut terminal, &mut app);

    let text = all_text(&terminal);
    assert!(text.contains("Common side effects"), "got:\n{text}");
    assert!(text.contains("Severe side effects"), "got:\n{text}");
    assert!(text.contains("Serotonin syndrome"), "got:\n{text}");
}

#[test]
fn long_conversation_follows_the_bottom() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut app = new_app();
    let highlighter = app.highlighter.clone();

    for i in 0..10 {
        type_text(&mut app, &format!("question {i}"));
        app.view.submit();
        app.view.settle(
            ExchangeOutcome::Response(format!("<p>answer {i}</p>")),
            &highlighter,
        );
    }
    draw(&mut terminal, &mut app);

    assert!(app.chat_max_scroll > 0);
    assert_eq!(app.chat_scroll, app.chat_max_scroll);
    let text = all_text(&terminal);
    assert!(text.contains("answer 9"), "got:\n{text}");
    assert!(!text.contains("question 0"), "got:\n{text}");
}
