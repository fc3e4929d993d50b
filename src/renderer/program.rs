// renderer/program.rs
use super::device::{ProgramHandle, Uniform};
use bitflags::bitflags;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(Cow<'static, str>);

impl ProgramId {
    pub const DEFAULT: ProgramId = ProgramId(Cow::Borrowed("default"));
    pub const DEFAULT_WIREFRAME: ProgramId = ProgramId(Cow::Borrowed("default_wireframe"));
    pub const INSTANCE: ProgramId = ProgramId(Cow::Borrowed("instance"));
    pub const INSTANCE_WIREFRAME: ProgramId = ProgramId(Cow::Borrowed("instance_wireframe"));
    pub const POINT_MESH: ProgramId = ProgramId(Cow::Borrowed("point_mesh"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UniformSet: u16 {
        const PROJECTION = 1 << 0;
        const MODEL_VIEW = 1 << 1;
        const MODEL_VIEW_PROJECTION = 1 << 2;
        const NORMAL_MATRIX = 1 << 3;
        const LIGHT_POSITION = 1 << 4;
        const COLOR = 1 << 5;
        const USE_TEXTURE = 1 << 6;
        const UNLIT = 1 << 7;
        const IS_BILLBOARD = 1 << 8;
        const BILLBOARD_SIZE = 1 << 9;
        const BILLBOARD_ROTATION = 1 << 10;
        const SCREEN = 1 << 11;
    }
}

impl UniformSet {
    pub fn declares(self, uniform: Uniform) -> bool {
        self.contains(Self::from(uniform))
    }
}

impl From<Uniform> for UniformSet {
    fn from(uniform: Uniform) -> Self {
        match uniform {
            Uniform::Projection => UniformSet::PROJECTION,
            Uniform::ModelView => UniformSet::MODEL_VIEW,
            Uniform::ModelViewProjection => UniformSet::MODEL_VIEW_PROJECTION,
            Uniform::NormalMatrix => UniformSet::NORMAL_MATRIX,
            Uniform::LightPosition => UniformSet::LIGHT_POSITION,
            Uniform::Color => UniformSet::COLOR,
            Uniform::UseTexture => UniformSet::USE_TEXTURE,
            Uniform::Unlit => UniformSet::UNLIT,
            Uniform::IsBillboard => UniformSet::IS_BILLBOARD,
            Uniform::BillboardSize => UniformSet::BILLBOARD_SIZE,
            Uniform::BillboardRotation => UniformSet::BILLBOARD_ROTATION,
            Uniform::Screen => UniformSet::SCREEN,
        }
    }
}

/// Attribute locations and uniforms of one linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLayout {
    pub handle: ProgramHandle,
    pub position: Option<u32>,
    pub normal: Option<u32>,
    pub texcoord: Option<u32>,
    /// First of four consecutive column slots.
    pub model: Option<u32>,
    pub color_instance: Option<u32>,
    pub translation: Option<u32>,
    pub barycentric: Option<u32>,
    pub uniforms: UniformSet,
}

impl ProgramLayout {
    fn base(handle: ProgramHandle) -> Self {
        Self {
            handle,
            position: Some(0),
            normal: Some(1),
            texcoord: Some(2),
            model: None,
            color_instance: None,
            translation: None,
            barycentric: None,
            uniforms: UniformSet::all(),
        }
    }

    /// Non-instanced mesh program with a color uniform.
    pub fn mesh(handle: ProgramHandle) -> Self {
        Self::base(handle)
    }

    /// Per-instance model matrix in slots 3..=6 and color in slot 7.
    pub fn instanced(handle: ProgramHandle) -> Self {
        Self {
            model: Some(3),
            color_instance: Some(7),
            uniforms: UniformSet::all() - UniformSet::COLOR,
            ..Self::base(handle)
        }
    }

    /// Per-instance translation in slot 3 and color in slot 4.
    pub fn point_mesh(handle: ProgramHandle) -> Self {
        Self {
            translation: Some(3),
            color_instance: Some(4),
            uniforms: UniformSet::all() - UniformSet::COLOR,
            ..Self::base(handle)
        }
    }

    /// Adds the barycentric slot right after the highest slot in use.
    pub fn with_barycentric(mut self) -> Self {
        let next = self.attribs().into_iter().max().map_or(0, |slot| slot + 1);
        self.barycentric = Some(next);
        self
    }

    pub fn model_attribs(&self) -> Vec<u32> {
        self.model
            .map(|base| (base..base + 4).collect())
            .unwrap_or_default()
    }

    /// Every slot this program reads, in ascending order.
    pub fn attribs(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = [
            self.position,
            self.normal,
            self.texcoord,
            self.color_instance,
            self.translation,
            self.barycentric,
        ]
        .into_iter()
        .flatten()
        .chain(self.model_attribs())
        .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    pub fn is_instanced(&self) -> bool {
        self.model.is_some() || self.translation.is_some()
    }
}

#[derive(Default)]
pub struct ProgramManager {
    programs: HashMap<ProgramId, ProgramLayout>,
}

impl ProgramManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the five built-in program ids against host-linked handles.
    pub fn with_builtin(
        default: ProgramHandle,
        default_wireframe: ProgramHandle,
        instance: ProgramHandle,
        instance_wireframe: ProgramHandle,
        point_mesh: ProgramHandle,
    ) -> Self {
        let mut manager = Self::new();
        manager.add_program(ProgramId::DEFAULT, ProgramLayout::mesh(default));
        manager.add_program(
            ProgramId::DEFAULT_WIREFRAME,
            ProgramLayout::mesh(default_wireframe).with_barycentric(),
        );
        manager.add_program(ProgramId::INSTANCE, ProgramLayout::instanced(instance));
        manager.add_program(
            ProgramId::INSTANCE_WIREFRAME,
            ProgramLayout::instanced(instance_wireframe).with_barycentric(),
        );
        manager.add_program(ProgramId::POINT_MESH, ProgramLayout::point_mesh(point_mesh));
        manager
    }

    /// Replaces any layout already registered under `id`.
    pub fn add_program(&mut self, id: ProgramId, layout: ProgramLayout) {
        if self.programs.insert(id.clone(), layout).is_some() {
            log::info!("Program '{}' replaced", id);
        }
    }

    pub fn remove_program(&mut self, id: &ProgramId) -> Option<ProgramLayout> {
        self.programs.remove(id)
    }

    pub fn get(&self, id: &ProgramId) -> Option<&ProgramLayout> {
        self.programs.get(id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instanced_layout_uses_four_model_slots() {
        let layout = ProgramLayout::instanced(ProgramHandle(1));
        assert_eq!(layout.model_attribs(), vec![3, 4, 5, 6]);
        assert_eq!(layout.attribs(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(layout.is_instanced());
        assert!(!layout.uniforms.declares(Uniform::Color));
    }

    #[test]
    fn barycentric_goes_after_last_slot() {
        let mesh = ProgramLayout::mesh(ProgramHandle(1)).with_barycentric();
        assert_eq!(mesh.barycentric, Some(3));
        let inst = ProgramLayout::instanced(ProgramHandle(2)).with_barycentric();
        assert_eq!(inst.barycentric, Some(8));
    }

    #[test]
    fn builtin_programs_resolve() {
        let manager = ProgramManager::with_builtin(
            ProgramHandle(1),
            ProgramHandle(2),
            ProgramHandle(3),
            ProgramHandle(4),
            ProgramHandle(5),
        );
        assert_eq!(manager.len(), 5);
        let point = manager.get(&ProgramId::POINT_MESH).unwrap();
        assert_eq!(point.translation, Some(3));
        assert!(manager.get(&ProgramId::new("missing")).is_none());
    }
}
