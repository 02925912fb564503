//! # Playback Tick
//!
//! Advances every sprite's clip time, derives its frame index and retires
//! instances whose lifetime ran out. This only produces *inputs* for the
//! renderer: frame changes are stamped like any other attribute change.

use super::component::FrameIndex;
use super::entity::{AnimationSetId, InstanceId};
use super::world::SpriteWorld;

/// Timing of one clip inside an animation set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipInfo {
    /// First frame of the clip in the set's frame table.
    pub first_frame: u32,
    /// Number of frames in the clip.
    pub frame_count: u32,
    /// Frames per second.
    pub fps: f32,
    /// Wraps around at the end instead of holding the last frame.
    pub looping: bool,
}

impl ClipInfo {
    /// Clip length in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        self.frame_count as f32 / self.fps
    }

    /// Absolute frame shown `time` seconds into the clip.
    #[must_use]
    pub fn frame_at(&self, time: f32) -> u32 {
        if self.frame_count == 0 {
            return self.first_frame;
        }
        let step = (time.max(0.0) * self.fps).floor() as u32;
        let local = if self.looping {
            step % self.frame_count
        } else {
            step.min(self.frame_count - 1)
        };
        self.first_frame + local
    }
}

/// Source of clip timing, implemented by whoever owns animation sets.
pub trait ClipLibrary {
    /// Timing of `clip` in `set`, if both exist.
    fn clip(&self, set: AnimationSetId, clip: u16) -> Option<ClipInfo>;
}

/// What one playback tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Instances whose frame index changed.
    pub frames_changed: usize,
    /// Instances despawned because their timer ran out.
    pub expired: usize,
    /// Instances despawned because their parent died.
    pub orphaned: usize,
}

impl SpriteWorld {
    /// Runs one playback step of `dt` seconds.
    ///
    /// Single-threaded: it mutates instances and despawns them.
    pub fn tick<L: ClipLibrary + ?Sized>(&mut self, dt: f32, clips: &L) -> TickReport {
        let mut report = TickReport::default();
        let tick = self.change_tick;
        let mut expired = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(instance) = slot.instance.as_mut() else {
                continue;
            };

            if let Some(remaining) = instance.lifetime.remaining.as_mut() {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    expired.push(InstanceId::new(index as u32, slot.generation));
                    continue;
                }
            }

            let Some(set) = instance.animation else {
                continue;
            };
            let Some(clip) = clips.clip(set, instance.playback.clip) else {
                continue;
            };

            let duration = clip.duration();
            let mut time = instance.playback.time + dt * instance.playback.speed;
            if duration > 0.0 {
                time = if clip.looping {
                    time.rem_euclid(duration)
                } else {
                    time.min(duration)
                };
            }
            instance.playback.time = time;

            let frame = FrameIndex::visible(clip.frame_at(time)).with_hidden(instance.playback.hidden);
            if instance.frame != frame {
                instance.frame = frame;
                instance.changed.frame = tick;
                report.frames_changed += 1;
            }
        }

        for id in expired {
            if self.despawn(id) {
                report.expired += 1;
            }
        }
        report.orphaned = self.despawn_orphans();
        report
    }

    /// Despawns instances bound to a parent that is gone, cascading.
    fn despawn_orphans(&mut self) -> usize {
        let mut total = 0;
        loop {
            let orphans: Vec<InstanceId> = self
                .iter()
                .filter(|(_, instance)| {
                    instance
                        .lifetime
                        .parent
                        .is_some_and(|parent| !self.is_alive(parent))
                })
                .map(|(id, _)| id)
                .collect();
            if orphans.is_empty() {
                return total;
            }
            for id in orphans {
                if self.despawn(id) {
                    total += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Lifetime, SpriteDesc, SpriteTransform};

    struct OneClip(ClipInfo);

    impl ClipLibrary for OneClip {
        fn clip(&self, _set: AnimationSetId, clip: u16) -> Option<ClipInfo> {
            (clip == 0).then_some(self.0)
        }
    }

    const WALK: ClipInfo = ClipInfo {
        first_frame: 4,
        frame_count: 4,
        fps: 10.0,
        looping: true,
    };

    fn sprite() -> SpriteDesc {
        SpriteDesc::new(AnimationSetId(1), SpriteTransform::IDENTITY)
    }

    #[test]
    fn test_clip_frame_at() {
        assert_eq!(WALK.frame_at(0.0), 4);
        assert_eq!(WALK.frame_at(0.25), 6);
        assert_eq!(WALK.frame_at(0.45), 4);

        let once = ClipInfo { looping: false, ..WALK };
        assert_eq!(once.frame_at(10.0), 7);
    }

    #[test]
    fn test_tick_advances_frames() {
        let mut world = SpriteWorld::new();
        let id = world.spawn(sprite());
        let report = world.tick(0.15, &OneClip(WALK));
        assert_eq!(report.frames_changed, 1);
        assert_eq!(world.get(id).map(|i| i.frame), Some(FrameIndex::visible(5)));
    }

    #[test]
    fn test_hidden_sprite_advances_negative() {
        let mut world = SpriteWorld::new();
        let id = world.spawn(sprite());
        world.set_hidden(id, true);
        world.tick(0.25, &OneClip(WALK));
        assert_eq!(world.get(id).map(|i| i.frame), Some(FrameIndex::hidden(6)));
    }

    #[test]
    fn test_timed_lifetime_expires() {
        let mut world = SpriteWorld::new();
        let id = world.spawn(sprite().with_lifetime(Lifetime::timed(0.5)));
        assert_eq!(world.tick(0.3, &OneClip(WALK)).expired, 0);
        assert_eq!(world.tick(0.3, &OneClip(WALK)).expired, 1);
        assert!(!world.is_alive(id));
    }

    #[test]
    fn test_orphans_cascade() {
        let mut world = SpriteWorld::new();
        let root = world.spawn(sprite());
        let child = world.spawn(sprite().with_lifetime(Lifetime::bound_to(root)));
        let grandchild = world.spawn(sprite().with_lifetime(Lifetime::bound_to(child)));
        world.despawn(root);

        let report = world.tick(0.0, &OneClip(WALK));
        assert_eq!(report.orphaned, 2);
        assert!(!world.is_alive(child));
        assert!(!world.is_alive(grandchild));
    }

    #[test]
    fn test_zero_speed_freezes() {
        let mut world = SpriteWorld::new();
        let id = world.spawn(sprite());
        world.set_play_speed(id, 0.0);
        world.tick(1.0, &OneClip(WALK));
        assert_eq!(world.tick(1.0, &OneClip(WALK)).frames_changed, 0);
        assert_eq!(world.get(id).map(|i| i.playback.time), Some(0.0));
        assert_eq!(world.get(id).map(|i| i.frame), Some(FrameIndex::visible(4)));
    }
}
