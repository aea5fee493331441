//! Terminal front-end for a `QuizSession`, drawn with crossterm.

use crate::core::QuizSource;
use crate::quiz::QuizSession;
use crate::view::{render, Mark, SessionView, ANSWER_THIS, SELECT_HINT};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use tracing::debug;

const HELP_INPUT: &str = "[Enter] generate  [Esc] back to quiz / quit";
const HELP_QUIZ: &str = "[↑/↓] question  [←/→] answer  [Space/1-9] select  [c] check  [g] new prompt  [q] quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Input,
    Quiz,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub text: String,
    pub color: Option<Color>,
    pub bold: bool,
    pub highlight: bool,
    /// Drawn with the red outline of an unanswered question
    pub outlined: bool,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self { text: text.into(), color: Some(color), ..Default::default() }
    }
}

/// Lay out the quiz part of the screen. Returns the rows and the row index of
/// the highlighted option, if any.
pub fn layout(view: &SessionView, cursor: Option<(usize, usize)>) -> (Vec<Line>, Option<usize>) {
    let mut lines = Vec::new();
    let mut focus = None;

    for (q_idx, q) in view.questions.iter().enumerate() {
        let outlined = q.flagged;
        lines.push(Line { text: format!("Question {}", q.number), bold: true, outlined, ..Default::default() });
        lines.push(Line { text: q.text.clone(), outlined, ..Default::default() });
        lines.push(Line { text: SELECT_HINT.to_string(), color: Some(Color::DarkGrey), outlined, ..Default::default() });

        for (a_idx, option) in q.options.iter().enumerate() {
            let marker = if option.selected { "(•)" } else { "( )" };
            let (color, bold) = match option.mark {
                Mark::Correct => (Some(Color::Green), true),
                Mark::Wrong => (Some(Color::Red), true),
                Mark::Neutral => (None, false),
            };
            let highlight = cursor == Some((q_idx, a_idx));
            if highlight {
                focus = Some(lines.len());
            }
            lines.push(Line {
                text: format!("  {} {}. {}", marker, a_idx + 1, option.text),
                color,
                bold,
                highlight,
                outlined,
            });
        }

        if outlined {
            lines.push(Line { text: ANSWER_THIS.to_string(), color: Some(Color::Red), outlined, ..Default::default() });
        }
        lines.push(Line::plain(""));
    }

    if !view.questions.is_empty() {
        lines.push(Line { text: "[c] Check Answers".to_string(), bold: true, ..Default::default() });
    }
    if let Some(score) = view.score_line() {
        lines.push(Line { text: score, bold: true, ..Default::default() });
    }

    (lines, focus)
}

/// The character a key press adds to the prompt. Chords with Ctrl or Alt add nothing.
fn typed_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => Some(c),
        _ => None,
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter(out: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = execute!(out, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Interactive quiz in the terminal.
pub struct QuizTui<S: QuizSource> {
    source: S,
    session: QuizSession,
    mode: Mode,
    question: usize,
    answer: usize,
}

impl<S: QuizSource> QuizTui<S> {
    pub fn new(source: S) -> Self {
        Self { source, session: QuizSession::new(), mode: Mode::Input, question: 0, answer: 0 }
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Run until the user quits. With `prompt` set, generation starts right away.
    pub async fn run(mut self, prompt: Option<String>) -> io::Result<QuizSession> {
        let mut out = io::stdout();
        let _guard = RawModeGuard::enter(&mut out)?;

        if let Some(prompt) = prompt {
            self.session.set_prompt(prompt);
            self.generate(&mut out).await?;
        }

        loop {
            self.draw(&mut out)?;
            let event = tokio::task::block_in_place(event::read)?;
            let Event::Key(key) = event else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            let keep_going = match self.mode {
                Mode::Input => self.on_input_key(key, &mut out).await?,
                Mode::Quiz => self.on_quiz_key(key),
            };
            if !keep_going {
                break;
            }
        }

        Ok(self.session)
    }

    async fn on_input_key(&mut self, key: KeyEvent, out: &mut Stdout) -> io::Result<bool> {
        match key.code {
            KeyCode::Char(_) => {
                if let Some(c) = typed_char(&key) {
                    self.session.prompt_mut().push(c);
                }
            }
            KeyCode::Backspace => {
                self.session.prompt_mut().pop();
            }
            KeyCode::Enter => {
                if self.session.can_generate() {
                    self.generate(out).await?;
                }
            }
            KeyCode::Esc => {
                if self.session.questions().is_empty() {
                    return Ok(false);
                }
                self.mode = Mode::Quiz;
            }
            _ => {}
        }
        Ok(true)
    }

    fn on_quiz_key(&mut self, key: KeyEvent) -> bool {
        let count = self.session.questions().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('g') => self.mode = Mode::Input,
            KeyCode::Char('c') => {
                let outcome = self.session.check();
                debug!(?outcome, "Checked answers");
            }
            KeyCode::Up | KeyCode::Char('k') if self.question > 0 => {
                self.question -= 1;
                self.clamp_answer();
            }
            KeyCode::Down | KeyCode::Char('j') if self.question + 1 < count => {
                self.question += 1;
                self.clamp_answer();
            }
            KeyCode::Left | KeyCode::Char('h') => self.answer = self.answer.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => {
                self.answer += 1;
                self.clamp_answer();
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.select(self.answer),
            KeyCode::Char(d @ '1'..='9') => {
                let answer = (d as usize) - ('1' as usize);
                self.select(answer);
            }
            _ => {}
        }
        true
    }

    fn select(&mut self, answer: usize) {
        if self.session.select(self.question, answer).is_ok() {
            self.answer = answer;
        }
    }

    fn clamp_answer(&mut self) {
        let options = self.session.questions().get(self.question).map_or(0, |q| q.answers.len());
        self.answer = self.answer.min(options.saturating_sub(1));
    }

    async fn generate(&mut self, out: &mut Stdout) -> io::Result<()> {
        let Ok(prompt) = self.session.begin_generation() else {
            return Ok(());
        };
        self.draw(out)?;
        let result = self.source.generate(&prompt).await;
        self.session.finish_generation(result);

        self.question = 0;
        self.answer = 0;
        self.mode = if self.session.questions().is_empty() { Mode::Input } else { Mode::Quiz };
        Ok(())
    }

    fn draw(&self, out: &mut Stdout) -> io::Result<()> {
        let (_, rows) = terminal::size()?;
        let view = render(&self.session);

        queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

        let mut header = vec![Line { text: "Quiz generator".to_string(), bold: true, ..Default::default() }];
        let prompt_line = match self.mode {
            Mode::Input => format!("Prompt: {}_", self.session.prompt()),
            Mode::Quiz => format!("Prompt: {}", self.session.prompt()),
        };
        header.push(Line::plain(prompt_line));
        header.push(if self.session.is_loading() {
            Line::colored("Generating...", Color::Yellow)
        } else if self.mode == Mode::Input {
            Line::colored(HELP_INPUT, Color::DarkGrey)
        } else {
            Line::colored(HELP_QUIZ, Color::DarkGrey)
        });
        if let Some(error) = &view.error {
            header.push(Line::colored(error.clone(), Color::Red));
        }
        header.push(Line::plain(""));

        let cursor = (self.mode == Mode::Quiz).then_some((self.question, self.answer));
        let (body, focus) = layout(&view, cursor);

        let available = (rows as usize).saturating_sub(header.len()).max(1);
        let start = focus.map_or(0, |f| f.saturating_sub(available / 2));
        let start = start.min(body.len().saturating_sub(available));

        let mut row: u16 = 0;
        for line in header.iter().chain(body.iter().skip(start).take(available)) {
            draw_line(out, row, line)?;
            row += 1;
        }
        out.flush()
    }
}

fn draw_line(out: &mut Stdout, row: u16, line: &Line) -> io::Result<()> {
    queue!(out, MoveTo(0, row))?;
    if line.outlined {
        queue!(out, SetForegroundColor(Color::Red), Print("┃ "), ResetColor)?;
    }
    if let Some(color) = line.color {
        queue!(out, SetForegroundColor(color))?;
    }
    if line.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if line.highlight {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    queue!(out, Print(&line.text), SetAttribute(Attribute::Reset), ResetColor)?;
    Ok(())
}
