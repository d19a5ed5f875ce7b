//! Interactive selection state
//!
//! A [`Session`] tracks which character is current and which emotion and
//! background the next card uses, then drives one clipboard round trip per
//! [`Session::generate`] call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use textbox_cache::Bitmap;

use crate::assets::ImageSource;
use crate::character::CharacterMetadata;
use crate::clipboard::ClipboardSource;
use crate::compositor::{CardRequest, Compositor};
use crate::error::{ComposeError, GenerateError};

/// Allows at most one generation in flight
#[derive(Debug, Clone, Default)]
pub struct GenerationGuard {
    busy: Arc<AtomicBool>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, failing immediately if it is held
    pub fn try_begin(&self) -> Result<GenerationTicket, GenerateError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GenerateError::Busy)?;
        Ok(GenerationTicket {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop
#[derive(Debug)]
pub struct GenerationTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for GenerationTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Outcome of a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub character: String,
    pub emotion: u32,
    pub background: u32,
    /// True when the clipboard image was drawn instead of text
    pub from_image: bool,
    pub png_len: usize,
}

struct Selection {
    /// 1-based index into the roster
    current: usize,
    /// Fixed emotion, `None` for random
    emotion: Option<u32>,
    /// Fixed background, `None` for random
    background: Option<u32>,
    last_emotion: Option<u32>,
    /// `(emotion, background)` chosen by the last preview
    prepared: Option<(u32, u32)>,
    rng: StdRng,
}

pub struct Session {
    compositor: Arc<Compositor>,
    selection: Mutex<Selection>,
    guard: GenerationGuard,
}

impl Session {
    pub fn new(compositor: Arc<Compositor>) -> Result<Self, ComposeError> {
        Self::with_rng(compositor, StdRng::from_entropy())
    }

    /// Session with a deterministic random source
    pub fn with_seed(compositor: Arc<Compositor>, seed: u64) -> Result<Self, ComposeError> {
        Self::with_rng(compositor, StdRng::seed_from_u64(seed))
    }

    fn with_rng(compositor: Arc<Compositor>, rng: StdRng) -> Result<Self, ComposeError> {
        if compositor.characters().is_empty() {
            return Err(ComposeError::EmptyRoster);
        }
        Ok(Self {
            compositor,
            selection: Mutex::new(Selection {
                current: 1,
                emotion: None,
                background: None,
                last_emotion: None,
                prepared: None,
                rng,
            }),
            guard: GenerationGuard::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    pub fn guard(&self) -> &GenerationGuard {
        &self.guard
    }

    pub fn roster_len(&self) -> usize {
        self.compositor.characters().len()
    }

    /// 1-based index of the current character
    pub fn current_index(&self) -> usize {
        self.lock().current
    }

    pub fn current_character(&self) -> &CharacterMetadata {
        let index = self.current_index();
        &self.compositor.characters()[index - 1]
    }

    pub fn selected_emotion(&self) -> Option<u32> {
        self.lock().emotion
    }

    pub fn selected_background(&self) -> Option<u32> {
        self.lock().background
    }

    /// Make the character at 1-based `index` current
    ///
    /// Cached frames and the base image are dropped; a fixed emotion is reset
    /// to 1 since the new character may have fewer frames.
    pub fn switch_character(&self, index: usize) -> Result<(), ComposeError> {
        let count = self.roster_len();
        if !(1..=count).contains(&index) {
            return Err(ComposeError::CharacterIndex { index, count });
        }
        let id = &self.compositor.characters()[index - 1].id;
        self.compositor.switch_character(id)?;

        let mut selection = self.lock();
        selection.current = index;
        if selection.emotion.is_some() {
            selection.emotion = Some(1);
        }
        selection.last_emotion = None;
        selection.prepared = None;
        tracing::info!(character = %id, index, "switched character");
        Ok(())
    }

    pub fn next_character(&self) -> Result<usize, ComposeError> {
        let next = wrap_next(self.current_index() as u32, self.roster_len() as u32) as usize;
        self.switch_character(next)?;
        Ok(next)
    }

    pub fn prev_character(&self) -> Result<usize, ComposeError> {
        let prev = wrap_prev(self.current_index() as u32, self.roster_len() as u32) as usize;
        self.switch_character(prev)?;
        Ok(prev)
    }

    /// Fix the emotion, or pass `None` to pick randomly per card
    pub fn set_emotion(&self, emotion: Option<u32>) -> Result<(), ComposeError> {
        let count = self.current_character().emotion_count;
        check_range("emotion", emotion, count)?;
        let mut selection = self.lock();
        selection.emotion = emotion;
        selection.prepared = None;
        Ok(())
    }

    /// Fix the background, or pass `None` to pick randomly per card
    pub fn set_background(&self, background: Option<u32>) -> Result<(), ComposeError> {
        let count = self.compositor.images().background_count();
        check_range("background", background, count)?;
        let mut selection = self.lock();
        selection.background = background;
        selection.prepared = None;
        Ok(())
    }

    /// Step the fixed emotion forward; from random this selects emotion 1
    pub fn next_emotion(&self) -> u32 {
        let count = self.current_character().emotion_count.max(1);
        let mut selection = self.lock();
        let next = selection.emotion.map_or(1, |current| wrap_next(current, count));
        selection.emotion = Some(next);
        selection.prepared = None;
        next
    }

    /// Step the fixed emotion back; from random this selects the last emotion
    pub fn prev_emotion(&self) -> u32 {
        let count = self.current_character().emotion_count.max(1);
        let mut selection = self.lock();
        let prev = selection.emotion.map_or(count, |current| wrap_prev(current, count));
        selection.emotion = Some(prev);
        selection.prepared = None;
        prev
    }

    pub fn next_background(&self) -> u32 {
        let count = self.compositor.images().background_count().max(1);
        let mut selection = self.lock();
        let next = selection.background.map_or(1, |current| wrap_next(current, count));
        selection.background = Some(next);
        selection.prepared = None;
        next
    }

    pub fn prev_background(&self) -> u32 {
        let count = self.compositor.images().background_count().max(1);
        let mut selection = self.lock();
        let prev = selection.background.map_or(count, |current| wrap_prev(current, count));
        selection.background = Some(prev);
        selection.prepared = None;
        prev
    }

    /// Settle the emotion and background for the next card and return its
    /// base image
    pub fn prepare_preview(&self) -> Result<Bitmap, ComposeError> {
        let character = self.current_character();
        let (emotion, background) = self.settle(character.emotion_count);
        self.compositor.preview(&character.id, background, emotion)
    }

    /// `(emotion, background)` for the next card, rolling random picks once
    fn settle(&self, emotion_count: u32) -> (u32, u32) {
        let background_count = self.compositor.images().background_count().max(1);
        let mut selection = self.lock();
        if let Some(prepared) = selection.prepared {
            return prepared;
        }

        let emotion = match selection.emotion {
            Some(emotion) => emotion,
            None => {
                let last = selection.last_emotion;
                let emotion = random_emotion(&mut selection.rng, emotion_count.max(1), last);
                selection.last_emotion = Some(emotion);
                emotion
            }
        };
        let background = match selection.background {
            Some(background) => background,
            None => selection.rng.gen_range(1..=background_count),
        };
        selection.prepared = Some((emotion, background));
        (emotion, background)
    }

    /// Read the clipboard, compose a card and write it back
    ///
    /// Fails with [`GenerateError::Busy`] while another generation runs.
    pub fn generate(&self, clipboard: &mut dyn ClipboardSource) -> Result<GenerationReport, GenerateError> {
        let _ticket = self.guard.try_begin()?;

        let text = clipboard.get_text().trim().to_string();
        let image = clipboard.get_image();
        if text.is_empty() && image.is_none() {
            return Err(ComposeError::EmptyInput.into());
        }

        let character = self.current_character();
        let (emotion, background) = self.settle(character.emotion_count);
        let from_image = image.is_some();

        let mut request = CardRequest::new(character.id.clone(), background, emotion);
        if !text.is_empty() {
            request = request.with_text(text);
        }
        if let Some(image) = image {
            request = request.with_image(ImageSource::from(image));
        }

        let png = self.compositor.compose(request)?;
        clipboard.set_image(&png)?;

        {
            let mut selection = self.lock();
            selection.last_emotion = None;
            selection.prepared = None;
        }

        let report = GenerationReport {
            character: character.id.clone(),
            emotion,
            background,
            from_image,
            png_len: png.len(),
        };
        tracing::info!(
            character = %report.character,
            emotion,
            background,
            bytes = report.png_len,
            "generated card"
        );
        Ok(report)
    }
}

fn check_range(what: &'static str, index: Option<u32>, count: u32) -> Result<(), ComposeError> {
    match index {
        Some(index) if !(1..=count).contains(&index) => Err(ComposeError::SelectionRange { what, index, count }),
        _ => Ok(()),
    }
}

fn wrap_next(current: u32, count: u32) -> u32 {
    if current >= count {
        1
    } else {
        current + 1
    }
}

fn wrap_prev(current: u32, count: u32) -> u32 {
    if current <= 1 {
        count
    } else {
        current - 1
    }
}

/// Uniform pick in `1..=count` that differs from `last` when possible
fn random_emotion(rng: &mut impl Rng, count: u32, last: Option<u32>) -> u32 {
    match last {
        Some(last) if count > 1 && (1..=count).contains(&last) => {
            let pick = rng.gen_range(1..count);
            if pick >= last {
                pick + 1
            } else {
                pick
            }
        }
        _ => rng.gen_range(1..=count),
    }
}
