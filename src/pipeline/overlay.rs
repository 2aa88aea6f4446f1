use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    histogram::DepthHistogram,
    lifecycle::UserLifecycleTracker,
    types::{BoundingBox, DepthFrame, Joint, JointKind, SkeletonState, TrackerFrame, UserData},
};

/// Bones drawn for a tracked user.
pub const LIMBS: &[(JointKind, JointKind)] = &[
    (JointKind::Head, JointKind::Neck),
    (JointKind::LeftShoulder, JointKind::LeftElbow),
    (JointKind::LeftElbow, JointKind::LeftHand),
    (JointKind::RightShoulder, JointKind::RightElbow),
    (JointKind::RightElbow, JointKind::RightHand),
    (JointKind::LeftShoulder, JointKind::RightShoulder),
    (JointKind::LeftShoulder, JointKind::Torso),
    (JointKind::RightShoulder, JointKind::Torso),
    (JointKind::Torso, JointKind::LeftHip),
    (JointKind::Torso, JointKind::RightHip),
    (JointKind::LeftHip, JointKind::RightHip),
    (JointKind::LeftHip, JointKind::LeftKnee),
    (JointKind::LeftKnee, JointKind::LeftFoot),
    (JointKind::RightHip, JointKind::RightKnee),
    (JointKind::RightKnee, JointKind::RightFoot),
];

// Users cycle through the first three entries; the last one is background.
const PALETTE: [[f32; 3]; 4] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
];
const USER_COLORS: usize = 3;

const LIMB_THICKNESS: i32 = 2;
const JOINT_RADIUS: i32 = 5;
const MIN_DRAW_CONFIDENCE: f32 = 0.5;
const CENTER_OF_MASS_RADIUS: i32 = 4;
const GREY: [u8; 3] = [128, 128, 128];
const WHITE: [u8; 3] = [255, 255, 255];
const MESSAGE_COLOR: [u8; 3] = [255, 0, 0];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    pub draw_depth: bool,
    pub draw_background: bool,
    pub draw_skeleton: bool,
    pub draw_status_label: bool,
    pub draw_center_of_mass: bool,
    pub draw_bounding_box: bool,
    pub draw_frame_id: bool,
    /// Directory for PNG snapshots of the overlay. Disabled when unset.
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_every: u64,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            draw_depth: true,
            draw_background: true,
            draw_skeleton: true,
            draw_status_label: true,
            draw_center_of_mass: false,
            draw_bounding_box: false,
            draw_frame_id: false,
            snapshot_dir: None,
            snapshot_every: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayText {
    pub text: String,
    /// Anchor in depth image pixels.
    pub position: (f32, f32),
    pub color: [u8; 3],
}

#[derive(Clone, Debug)]
pub struct OverlayImage {
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub texts: Vec<OverlayText>,
}

/// Renders the depth view, skeletons and text items for one frame. Returns
/// `None` when the frame carries no usable depth image.
pub fn render(
    frame: &TrackerFrame,
    histogram: &DepthHistogram,
    lifecycle: &UserLifecycleTracker,
    general_message: Option<&str>,
    options: &OverlayOptions,
) -> Option<OverlayImage> {
    let depth = frame.depth.as_ref()?;
    let (width, height) = (depth.width, depth.height);
    let pixel_count = width as usize * height as usize;
    if pixel_count == 0 {
        return None;
    }
    if depth.pixels.len() < pixel_count {
        log::warn!(
            "depth buffer too small: got {}, expected {}",
            depth.pixels.len(),
            pixel_count
        );
        return None;
    }

    let mut rgb = vec![0u8; pixel_count * 3];
    if options.draw_depth {
        colorize_depth(&mut rgb, depth, histogram, options.draw_background);
    }

    let mut texts = Vec::new();
    for user in &frame.users {
        if user.is_new || user.is_lost {
            continue;
        }
        if options.draw_status_label {
            if let Some(label) = lifecycle.status_label(user.id) {
                texts.push(OverlayText {
                    text: label.to_string(),
                    position: user.center_of_mass,
                    color: invert(user_color(user)),
                });
            }
        }
        if options.draw_center_of_mass {
            let (x, y) = user.center_of_mass;
            draw_circle(
                &mut rgb,
                width,
                height,
                (x as i32, y as i32),
                CENTER_OF_MASS_RADIUS,
                WHITE,
            );
        }
        if options.draw_bounding_box {
            draw_bounding_box(&mut rgb, width, height, &user.bounding_box);
        }
        if options.draw_skeleton && user.skeleton.state == SkeletonState::Tracked {
            draw_skeleton(&mut rgb, width, height, user);
        }
    }

    if options.draw_frame_id {
        texts.push(OverlayText {
            text: frame.frame_index.to_string(),
            position: (20.0, 20.0),
            color: MESSAGE_COLOR,
        });
    }
    if let Some(message) = general_message {
        texts.push(OverlayText {
            text: message.to_string(),
            position: (100.0, 20.0),
            color: MESSAGE_COLOR,
        });
    }

    Some(OverlayImage {
        frame_index: frame.frame_index,
        width,
        height,
        rgb,
        texts,
    })
}

fn colorize_depth(
    rgb: &mut [u8],
    depth: &DepthFrame,
    histogram: &DepthHistogram,
    draw_background: bool,
) {
    let width = depth.width as usize;
    rgb.par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(row, out)| {
            let start = row * width;
            for x in 0..width {
                let value = depth.pixels[start + x];
                if value == 0 {
                    continue;
                }
                let label = depth.labels.get(start + x).copied().unwrap_or(0) as usize;
                let factor = match label {
                    0 if draw_background => PALETTE[USER_COLORS],
                    0 => [0.0; 3],
                    _ => PALETTE[label % USER_COLORS],
                };
                let intensity = histogram.intensity(value) as f32;
                for channel in 0..3 {
                    out[x * 3 + channel] = (intensity * factor[channel]) as u8;
                }
            }
        });
}

fn user_color(user: &UserData) -> [u8; 3] {
    let base = PALETTE[user.id as usize % USER_COLORS];
    [
        (base[0] * 255.0) as u8,
        (base[1] * 255.0) as u8,
        (base[2] * 255.0) as u8,
    ]
}

fn invert(color: [u8; 3]) -> [u8; 3] {
    [255 - color[0], 255 - color[1], 255 - color[2]]
}

fn draw_skeleton(buffer: &mut [u8], width: u32, height: u32, user: &UserData) {
    let color = invert(user_color(user));
    for &(a, b) in LIMBS {
        draw_limb(
            buffer,
            width,
            height,
            user.skeleton.joint(a),
            user.skeleton.joint(b),
            color,
        );
    }
}

fn draw_bounding_box(buffer: &mut [u8], width: u32, height: u32, bounds: &BoundingBox) {
    let corners = [
        (bounds.max.0, bounds.max.1),
        (bounds.max.0, bounds.min.1),
        (bounds.min.0, bounds.min.1),
        (bounds.min.0, bounds.max.1),
    ];
    for (i, &from) in corners.iter().enumerate() {
        let to = corners[(i + 1) % corners.len()];
        draw_line(buffer, width, height, from, to, WHITE, 1);
    }
}

fn draw_limb(buffer: &mut [u8], width: u32, height: u32, a: Joint, b: Joint, color: [u8; 3]) {
    if a.confidence < MIN_DRAW_CONFIDENCE || b.confidence < MIN_DRAW_CONFIDENCE {
        return;
    }

    let certain = |joint: &Joint| if joint.confidence >= 1.0 { color } else { GREY };
    let line_color = if a.confidence >= 1.0 && b.confidence >= 1.0 {
        color
    } else {
        GREY
    };

    draw_line(
        buffer,
        width,
        height,
        a.projected,
        b.projected,
        line_color,
        LIMB_THICKNESS,
    );
    for joint in [a, b] {
        let (x, y) = joint.projected;
        draw_circle(
            buffer,
            width,
            height,
            (x as i32, y as i32),
            JOINT_RADIUS,
            certain(&joint),
        );
    }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: (f32, f32),
    p1: (f32, f32),
    color: [u8; 3],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if ox.abs() + oy.abs() <= radius {
                    put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 3],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = (uy as usize * width as usize + ux as usize) * 3;
    if idx + 2 < buffer.len() {
        buffer[idx..idx + 3].copy_from_slice(&color);
    }
}
