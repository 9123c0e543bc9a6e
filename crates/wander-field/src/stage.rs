//! Everything the scheduler can animate, and the events it fires back.

use glam::{EulerRot, Quat, Vec3};
use wander_engine::{Animate, Camera3D, EntityId, Property, TweenValue};

use crate::field::Field;
use crate::gallery::Gallery;
use crate::overlay::Overlays;

/// Animation target key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Keyword(EntityId),
    Element(EntityId),
    Card(EntityId),
    Camera,
    /// Shared galaxy spin of the finale.
    Spin,
}

/// Completion events fired by timers, tasks and timelines.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    // Landing and help
    ShatterDone,
    HelpCheck,
    HelpDismissed(EntityId),

    // Project reveal
    RevealExplode,
    RevealBlur,
    RevealSentenceDone,
    RevealSentenceGone,
    RevealScrollStage,
    RevealDetailShown,

    // Find yourself
    FindExplode,
    FindSentenceDone,
    FindScatterDone,

    // Finale
    FinaleSpinDone,
    FinaleExplosion,
    FinaleWord(usize),
    FinaleWordsDone,
    FinaleExplodeWord,
    FinaleMessage,
    FinaleScatter,
    FinaleRestore,

    RemoveElement(EntityId),
    GalleryOpened(EntityId),
    GalleryReturned,
}

/// Animatable world state owned by the app.
#[derive(Debug, Default)]
pub struct Scene {
    pub field: Field,
    pub overlays: Overlays,
    pub gallery: Gallery,
    /// Angular speed of the finale galaxy, radians per second.
    pub spin_speed: f32,
    /// Accumulated galaxy angle.
    pub spin_angle: f32,
}

/// Scene plus camera, borrowed together for one scheduler tick.
pub struct Stage<'a> {
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera3D,
}

/// Camera orientation as (yaw, pitch, roll).
pub fn camera_euler(camera: &Camera3D) -> Vec3 {
    let (yaw, pitch, roll) = camera.orientation.to_euler(EulerRot::YXZ);
    Vec3::new(yaw, pitch, roll)
}

pub fn set_camera_euler(camera: &mut Camera3D, angles: Vec3) {
    camera.orientation = Quat::from_euler(EulerRot::YXZ, angles.x, angles.y, angles.z);
}

impl Animate<Target> for Stage<'_> {
    fn read(&self, target: Target, property: Property) -> Option<TweenValue> {
        match target {
            Target::Keyword(id) => {
                let e = self.scene.field.get(id)?;
                match property {
                    Property::Opacity => Some(e.opacity.into()),
                    Property::Position => Some(e.position.into()),
                    Property::Scale => Some(e.scale.into()),
                    Property::Rotation => Some(e.spin.into()),
                    Property::Tint => Some(e.tint.into()),
                    _ => None,
                }
            }
            Target::Element(id) => {
                let e = self.scene.overlays.get(id)?;
                match property {
                    Property::Opacity => Some(e.opacity.into()),
                    Property::Offset => Some(e.offset.into()),
                    Property::Scale => Some(e.scale.into()),
                    Property::Rotation => Some(e.rotation.into()),
                    _ => None,
                }
            }
            Target::Card(id) => {
                let c = self.scene.gallery.get(id)?;
                match property {
                    Property::Position => Some(c.position.into()),
                    Property::Scale => Some(c.scale.into()),
                    _ => None,
                }
            }
            Target::Camera => match property {
                Property::Position => Some(self.camera.position.into()),
                Property::Rotation => Some(camera_euler(self.camera).into()),
                _ => None,
            },
            Target::Spin => match property {
                Property::Speed => Some(self.scene.spin_speed.into()),
                _ => None,
            },
        }
    }

    fn write(&mut self, target: Target, property: Property, value: TweenValue) {
        match (target, value) {
            (Target::Keyword(id), value) => {
                let Some(e) = self.scene.field.get_mut(id) else { return };
                match (property, value) {
                    (Property::Opacity, TweenValue::Scalar(v)) => e.opacity = v,
                    (Property::Position, TweenValue::Vector(v)) => e.position = v,
                    (Property::Scale, TweenValue::Scalar(v)) => e.scale = v,
                    (Property::Rotation, TweenValue::Scalar(v)) => e.spin = v,
                    (Property::Tint, TweenValue::Vector(v)) => e.tint = v,
                    _ => {}
                }
            }
            (Target::Element(id), value) => {
                let Some(e) = self.scene.overlays.get_mut(id) else { return };
                match (property, value) {
                    (Property::Opacity, TweenValue::Scalar(v)) => e.opacity = v,
                    (Property::Offset, TweenValue::Vector(v)) => e.offset = v,
                    (Property::Scale, TweenValue::Scalar(v)) => e.scale = v,
                    (Property::Rotation, TweenValue::Scalar(v)) => e.rotation = v,
                    _ => {}
                }
            }
            (Target::Card(id), value) => {
                let Some(c) = self.scene.gallery.get_mut(id) else { return };
                match (property, value) {
                    (Property::Position, TweenValue::Vector(v)) => c.position = v,
                    (Property::Scale, TweenValue::Scalar(v)) => c.scale = v,
                    _ => {}
                }
            }
            (Target::Camera, TweenValue::Vector(v)) => match property {
                Property::Position => self.camera.position = v,
                Property::Rotation => set_camera_euler(self.camera, v),
                _ => {}
            },
            (Target::Spin, TweenValue::Scalar(v)) if property == Property::Speed => self.scene.spin_speed = v,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_engine::{Easing, Rng, Scheduler, Tween};

    #[test]
    fn keyword_tweens_reach_the_entity() {
        let mut scene = Scene::default();
        let mut rng = Rng::new(1);
        scene.field.spawn(EntityId(1), "sea", &mut rng, 16.0);
        let mut camera = Camera3D::default();
        let mut scheduler: Scheduler<Target, Cue> = Scheduler::new();
        scheduler.schedule(
            Tween::to(Target::Keyword(EntityId(1)), Property::Opacity, 0.6, 1.0).with_easing(Easing::Linear),
            Some(Cue::ShatterDone),
        );
        scheduler.schedule(Tween::to(Target::Keyword(EntityId(1)), Property::Tint, Vec3::ZERO, 0.5), None);
        for _ in 0..11 {
            scheduler.tick(0.1, &mut Stage { scene: &mut scene, camera: &mut camera });
        }
        let e = scene.field.get(EntityId(1)).unwrap();
        assert!((e.opacity - 0.6).abs() < 1e-4);
        assert_eq!(e.tint, Vec3::ZERO);
        assert_eq!(scheduler.drain_fired(), vec![Cue::ShatterDone]);
    }

    #[test]
    fn missing_targets_are_ignored() {
        let mut scene = Scene::default();
        let mut camera = Camera3D::default();
        let mut scheduler: Scheduler<Target, Cue> = Scheduler::new();
        scheduler.schedule(Tween::to(Target::Element(EntityId(9)), Property::Opacity, 1.0, 0.2), None);
        scheduler.tick(0.5, &mut Stage { scene: &mut scene, camera: &mut camera });
        assert!(scheduler.is_empty());
    }

    #[test]
    fn camera_rotation_round_trips_through_euler() {
        let mut camera = Camera3D::default();
        camera.yaw(0.4);
        camera.pitch(-0.2);
        let angles = camera_euler(&camera);
        let before = camera.forward();
        set_camera_euler(&mut camera, angles);
        assert!((camera.forward() - before).length() < 1e-4);
        set_camera_euler(&mut camera, Vec3::ZERO);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
    }
}
