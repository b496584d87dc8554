use std::time::{Duration, Instant};

use rover_kinematics::Twist;

/// A timestamped synthetic video frame, tightly packed RGB24.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Presentation index, starting at 0.
    pub pts: u64,
    /// Time since the producer was created.
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    fn blank(width: u32, height: u32) -> Self {
        VideoFrame {
            pts: 0,
            timestamp: Duration::ZERO,
            width,
            height,
            data: vec![0; (width * height * 3) as usize],
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 3) as usize;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, rgb: [u8; 3]) {
        for y in (cy - radius)..=(cy + radius) {
            for x in (cx - radius)..=(cx + radius) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= radius * radius {
                    self.put_pixel(x, y, rgb);
                }
            }
        }
    }

    fn fill_bar(&mut self, x: i32, y: i32, len: i32, thickness: i32, rgb: [u8; 3]) {
        for row in y..(y + thickness) {
            for col in x..(x + len) {
                self.put_pixel(col, row, rgb);
            }
        }
    }
}

/// Supplies synthetic video frames annotated with the current velocity.
///
/// The producer owns its own animation state; callers only pull frames.
pub trait FrameProducer: Send {
    fn next_frame(&mut self, twist: Twist) -> VideoFrame;
}

const BALL_RADIUS: i32 = 20;
const BAR_SCALE: f64 = 40.0;
const MAX_BAR_LEN: i32 = 200;

/// A ball bouncing around a black frame, with two overlay bars in the
/// bottom-left corner whose lengths track the commanded linear and angular
/// speeds.
pub struct BouncingBall {
    width: u32,
    height: u32,
    ball_x: i32,
    ball_y: i32,
    dx: i32,
    dy: i32,
    pts: u64,
    started: Instant,
}

impl BouncingBall {
    pub fn new(width: u32, height: u32) -> Self {
        BouncingBall {
            width,
            height,
            ball_x: width as i32 / 2,
            ball_y: height as i32 / 2,
            dx: 4,
            dy: 4,
            pts: 0,
            started: Instant::now(),
        }
    }

    fn bar_len(speed: f64) -> i32 {
        ((speed.abs() * BAR_SCALE) as i32).min(MAX_BAR_LEN)
    }
}

impl Default for BouncingBall {
    fn default() -> Self {
        BouncingBall::new(640, 480)
    }
}

impl FrameProducer for BouncingBall {
    fn next_frame(&mut self, twist: Twist) -> VideoFrame {
        self.ball_x += self.dx;
        self.ball_y += self.dy;
        if self.ball_x <= 0 || self.ball_x >= self.width as i32 {
            self.dx = -self.dx;
        }
        if self.ball_y <= 0 || self.ball_y >= self.height as i32 {
            self.dy = -self.dy;
        }

        let mut frame = VideoFrame::blank(self.width, self.height);
        frame.pts = self.pts;
        frame.timestamp = self.started.elapsed();
        frame.fill_circle(self.ball_x, self.ball_y, BALL_RADIUS, [0, 255, 0]);

        // Velocity annotation: linear above angular.
        let h = self.height as i32;
        frame.fill_bar(10, h - 24, Self::bar_len(twist.linear), 8, [255, 255, 255]);
        frame.fill_bar(10, h - 12, Self::bar_len(twist.angular), 8, [255, 255, 255]);

        self.pts += 1;
        frame
    }
}
