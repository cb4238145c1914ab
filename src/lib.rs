#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod hierarchy;
pub mod mapper;
pub mod math;
pub mod operators;
pub mod parse;
pub mod skeleton;

use std::fmt;

use hierarchy::Hierarchy;
use mapper::{Mapper, MapperError};
use math::{Pose, Quat, Vec3};
use serde::Serialize;
use skeleton::SkeletonDesc;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Pose van één node zoals die naar JavaScript gaat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseExport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    pub translation: [f32; 3],
    /// Quaternion als `[x, y, z, w]`.
    pub rotation: [f32; 4],
}

impl PoseExport {
    fn new(name: &str, parent: Option<usize>, pose: &Pose) -> Self {
        Self {
            name: name.to_owned(),
            parent,
            translation: pose.translation.to_array(),
            rotation: pose.rotation.to_array(),
        }
    }
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    mapper: Mapper,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            mapper: Mapper::new(),
        }
    }

    /// Geeft terug of de engine de minimale initialisatie heeft doorlopen.
    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Laad een skelet (`{ joints: [{ name, parent, translation, rotation }] }`).
    #[wasm_bindgen]
    pub fn load_skeleton(&mut self, skeleton: JsValue) -> Result<(), JsValue> {
        let skeleton: SkeletonDesc =
            serde_wasm_bindgen::from_value(skeleton).map_err(to_js_error)?;
        self.load_skeleton_desc(&skeleton);
        Ok(())
    }

    /// Laad een mapperconfiguratie (XML) bovenop het huidige skelet.
    #[wasm_bindgen]
    pub fn load_mapper(&mut self, xml: &str) -> Result<(), JsValue> {
        self.mapper.load_xml(xml).map_err(to_js_error)
    }

    /// Schrijf de huidige mapperconfiguratie als XML.
    #[wasm_bindgen]
    pub fn save_mapper(&self) -> Result<String, JsValue> {
        self.mapper.to_xml().map_err(to_js_error)
    }

    /// Werk de referentiepose van een location bij.
    #[wasm_bindgen]
    pub fn set_location(
        &mut self,
        name: &str,
        translation: &[f32],
        rotation: &[f32],
    ) -> Result<(), JsValue> {
        let pose = pose_from_slices(translation, rotation).map_err(|err| js_error(&err))?;
        self.update_location(name, pose).map_err(to_js_error)
    }

    /// Evalueer de mapper; levert een absolute pose per skeletnode.
    #[wasm_bindgen]
    pub fn map(&self) -> Result<JsValue, JsValue> {
        let poses = self.mapped_poses().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&poses).map_err(to_js_error)
    }

    /// De afgeleide hiërarchie met alleen gemapte nodes.
    #[wasm_bindgen]
    pub fn locations_hierarchy(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.location_nodes())
            .map_err(to_js_error)
    }

    /// Namen van alle geregistreerde operatorklassen.
    #[wasm_bindgen]
    pub fn operator_classes(&self) -> Result<JsValue, JsValue> {
        let names: Vec<&str> = operators::registry().names().collect();
        serde_wasm_bindgen::to_value(&names).map_err(to_js_error)
    }
}

impl Engine {
    #[must_use]
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn load_skeleton_desc(&mut self, skeleton: &SkeletonDesc) {
        self.mapper.create_from_skeleton(skeleton);
        debug_log!(
            "skelet geladen met {} joints",
            self.mapper.hierarchy().node_count()
        );
    }

    pub fn update_location(&mut self, name: &str, pose: Pose) -> Result<(), MapperError> {
        self.mapper.set_location_pose(name, pose)
    }

    pub fn mapped_poses(&self) -> Result<Vec<PoseExport>, MapperError> {
        let poses = self.mapper.map_to_vec()?;
        Ok(self
            .mapper
            .hierarchy()
            .nodes()
            .iter()
            .zip(&poses)
            .map(|(node, pose)| PoseExport::new(&node.name, node.parent, pose))
            .collect())
    }

    #[must_use]
    pub fn location_nodes(&self) -> Vec<PoseExport> {
        let mut output = Hierarchy::new();
        self.mapper.create_locations_hierarchy(&mut output);
        output
            .nodes()
            .iter()
            .map(|node| PoseExport::new(&node.name, node.parent, &node.pose))
            .collect()
    }
}

fn pose_from_slices(translation: &[f32], rotation: &[f32]) -> Result<Pose, String> {
    let translation: [f32; 3] = translation
        .try_into()
        .map_err(|_| format!("translatie verwacht 3 waarden, kreeg {}", translation.len()))?;
    let rotation: [f32; 4] = rotation
        .try_into()
        .map_err(|_| format!("rotatie verwacht 4 waarden, kreeg {}", rotation.len()))?;

    let rotation = Quat::from_array(rotation);
    if !rotation.is_finite() || rotation.length_squared() <= f32::EPSILON {
        return Err("rotatie is geen geldige quaternion".to_owned());
    }
    Ok(Pose::new(Vec3::from_array(translation), rotation.normalize()))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen::JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
