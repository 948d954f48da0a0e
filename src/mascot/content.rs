use std::{
    fs::File,
    io::BufReader,
    path::Path,
    time::{Duration, Instant},
};

use image::{codecs::gif::GifDecoder, AnimationDecoder, RgbaImage};

use crate::{debug, warn};

use super::asset::AssetDescriptor;

pub const BLANK_SIZE: u32 = 100;

/// One decoded picture, premultiplied BGRA rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
    pub delay: Duration,
}

impl Frame {
    pub fn from_rgba(img: &RgbaImage, delay: Duration) -> Self {
        let mut bgra = Vec::with_capacity(img.as_raw().len());
        for px in img.pixels() {
            let [r, g, b, a] = px.0;
            bgra.extend_from_slice(&[premultiply(b, a), premultiply(g, a), premultiply(r, a), a]);
        }
        Self {
            width: img.width(),
            height: img.height(),
            bgra,
            delay,
        }
    }

    /// Transparent square. Alpha is kept at 1 so the widget still receives clicks.
    fn blank() -> Self {
        Self {
            width: BLANK_SIZE,
            height: BLANK_SIZE,
            bgra: [0, 0, 0, 1].repeat((BLANK_SIZE * BLANK_SIZE) as usize),
            delay: Duration::ZERO,
        }
    }
}

#[inline]
fn premultiply(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    frames: Vec<Frame>,
}

impl Content {
    pub fn blank() -> Self {
        Self {
            frames: vec![Frame::blank()],
        }
    }

    /// Decodes `asset`. Unreadable files give blank content instead of an error.
    pub fn load(asset: &AssetDescriptor, min_frame_delay: Duration) -> Self {
        match decode(Path::new(&asset.path), asset.is_animated, min_frame_delay) {
            Ok(frames) if !frames.is_empty() => {
                debug!(
                    "[MASCOT][CONTENT] Decoded '{}' ({} frame(s))",
                    asset.path,
                    frames.len()
                );
                Self { frames }
            }
            Ok(_) => {
                warn!("[MASCOT][CONTENT] '{}' has no frames", asset.path);
                Self::blank()
            }
            Err(e) => {
                warn!("[MASCOT][CONTENT] Failed to decode '{}': {e}", asset.path);
                Self::blank()
            }
        }
    }

    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.frames == [Frame::blank()]
    }

    #[cfg(test)]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Size of the first frame.
    #[cfg(test)]
    pub fn size(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((BLANK_SIZE, BLANK_SIZE))
    }
}

pub fn decode(path: &Path, animated: bool, min_frame_delay: Duration) -> Result<Vec<Frame>, String> {
    if !animated {
        let img = image::open(path).map_err(|e| e.to_string())?;
        return Ok(vec![Frame::from_rgba(&img.to_rgba8(), Duration::ZERO)]);
    }

    let file = File::open(path).map_err(|e| e.to_string())?;
    let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| e.to_string())?;

    Ok(frames
        .into_iter()
        .map(|frame| {
            let delay = Duration::from(frame.delay()).max(min_frame_delay);
            Frame::from_rgba(frame.buffer(), delay)
        })
        .collect())
}

/// Frame player for a widget. Static content never advances.
#[derive(Debug)]
pub struct Animation {
    content: Content,
    index: usize,
    playing: bool,
    next_at: Option<Instant>,
}

impl Animation {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            index: 0,
            playing: false,
            next_at: None,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.content.frames.len() > 1
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current(&self) -> &Frame {
        &self.content.frames[self.index]
    }

    #[cfg(test)]
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Starts or resumes from the current frame. No-op for static content.
    pub fn start(&mut self, now: Instant) {
        if !self.is_animated() || self.playing {
            return;
        }
        self.playing = true;
        self.next_at = Some(now + self.current().delay);
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.next_at = None;
    }

    /// Advances past every frame whose delay has elapsed. Returns true when the
    /// visible frame changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.playing {
            return false;
        }
        let Some(mut due) = self.next_at else {
            return false;
        };

        let start = self.index;
        let count = self.content.frames.len();
        // Bounded so a long stall (sleep, debugger) cannot spin on zero delays.
        let mut steps = 0;
        while due <= now && steps < count {
            self.index = (self.index + 1) % count;
            due += self.current().delay;
            steps += 1;
        }
        if due <= now {
            due = now + self.current().delay;
        }
        self.next_at = Some(due);
        self.index != start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loaders::session::tests::unique_tmp_dir;
    use crate::mascot::asset::AssetRegistry;
    use image::{codecs::gif::GifEncoder, Delay, Rgba};

    fn write_gif(path: &Path, delays_ms: &[u32]) {
        let file = File::create(path).expect("create gif");
        let mut encoder = GifEncoder::new(file);
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            let shade = (i as u8).wrapping_mul(60);
            let buffer = RgbaImage::from_pixel(6, 4, Rgba([shade, 0, 255 - shade, 255]));
            image::Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(ms, 1))
        });
        encoder.encode_frames(frames).expect("encode gif");
    }

    fn frames(delays: &[u64]) -> Content {
        Content {
            frames: delays
                .iter()
                .map(|&ms| Frame {
                    width: 1,
                    height: 1,
                    bgra: vec![0, 0, 0, 255],
                    delay: Duration::from_millis(ms),
                })
                .collect(),
        }
    }

    #[test]
    fn pixels_are_premultiplied_bgra() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        let frame = Frame::from_rgba(&img, Duration::ZERO);
        assert_eq!(frame.bgra, vec![25, 50, 100, 128]);
    }

    #[test]
    fn static_image_decodes_to_one_frame() {
        let dir = unique_tmp_dir("content_png");
        let path = dir.join("still.png");
        RgbaImage::from_pixel(12, 7, Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("save png");

        let mut registry = AssetRegistry::new();
        let asset = registry.add(path.to_string_lossy(), "still", false).clone();
        let content = Content::load(&asset, Duration::from_millis(20));
        assert!(!content.is_blank());
        assert_eq!(content.size(), (12, 7));
        assert_eq!(content.frames().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn gif_frames_keep_delays_with_minimum_clamp() {
        let dir = unique_tmp_dir("content_gif");
        let path = dir.join("anim.gif");
        write_gif(&path, &[10, 80, 50]);

        let decoded = decode(&path, true, Duration::from_millis(20)).expect("decode");
        assert_eq!(decoded.len(), 3);
        assert_eq!((decoded[0].width, decoded[0].height), (6, 4));
        let delays: Vec<_> = decoded.iter().map(|f| f.delay).collect();
        assert_eq!(
            delays,
            [20, 80, 50].map(Duration::from_millis).to_vec()
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_or_corrupt_files_give_blank_content() {
        let dir = unique_tmp_dir("content_bad");
        let corrupt = dir.join("broken.png");
        std::fs::write(&corrupt, b"not an image").expect("write");

        let mut registry = AssetRegistry::new();
        let missing = registry.add(dir.join("gone.gif").to_string_lossy(), "gone", true).clone();
        let broken = registry.add(corrupt.to_string_lossy(), "broken", false).clone();
        for asset in [missing, broken] {
            let content = Content::load(&asset, Duration::from_millis(20));
            assert!(content.is_blank());
            assert_eq!(content.size(), (BLANK_SIZE, BLANK_SIZE));
            assert_eq!(content.frames()[0].bgra[3], 1);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn animation_advances_on_elapsed_delays() {
        let t0 = Instant::now();
        let mut anim = Animation::new(frames(&[100, 50, 200]));
        anim.start(t0);
        assert!(!anim.tick(t0 + Duration::from_millis(99)));
        assert!(anim.tick(t0 + Duration::from_millis(100)));
        assert_eq!(anim.current_index(), 1);
        // Covers frame 1 (50ms) and lands on 2.
        assert!(anim.tick(t0 + Duration::from_millis(160)));
        assert_eq!(anim.current_index(), 2);
        assert!(anim.tick(t0 + Duration::from_millis(350)));
        assert_eq!(anim.current_index(), 0);
    }

    #[test]
    fn stopped_or_static_animation_never_advances() {
        let t0 = Instant::now();
        let mut anim = Animation::new(frames(&[10, 10]));
        anim.start(t0);
        anim.stop();
        assert!(!anim.tick(t0 + Duration::from_secs(5)));

        let mut still = Animation::new(frames(&[0]));
        still.start(t0);
        assert!(!still.is_playing());
        assert!(!still.tick(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn long_stall_resynchronises_instead_of_spinning() {
        let t0 = Instant::now();
        let mut anim = Animation::new(frames(&[0, 0]));
        anim.start(t0);
        anim.tick(t0 + Duration::from_secs(60));
        assert!(anim.is_playing());
    }
}
