/// Discrete user commands of the interactive surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePlayback,
    AddTracker,
    Export,
}

impl Command {
    /// Maps a `wait_key` style key code
    pub fn from_key(key: i32) -> Option<Self> {
        match key & 0xFF {
            /* esc */ 27 => Some(Command::Quit),
            /* spc */ 32 => Some(Command::TogglePlayback),
            /*  q  */ 113 => Some(Command::AddTracker),
            /*  s  */ 115 => Some(Command::Export),
            _ => None,
        }
    }
}

/// Position in a fully loaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    frame_idx: usize,
    length: usize,
    playing: bool,
}

impl Playback {
    pub fn new(length: usize) -> Self {
        Self {
            frame_idx: 0,
            length,
            playing: false,
        }
    }

    #[inline]
    pub fn frame_idx(&self) -> usize {
        self.frame_idx
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline]
    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    #[inline]
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Steps one frame while playing. Running past the end rewinds and stops.
    pub fn advance(&mut self) {
        if !self.playing {
            return;
        }

        self.frame_idx += 1;

        if self.frame_idx >= self.length {
            self.frame_idx = 0;
            self.playing = false;
        }
    }
}
