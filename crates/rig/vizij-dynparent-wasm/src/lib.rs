use js_sys::JSON;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use vizij_dynparent_core::math::to_cols_array;
use vizij_dynparent_core::{
    bake_and_clear, clear, create, disable, CommandReport, Config, InteractionMode, Scene,
    Selection, Subject, VisualKeyingBake,
};

#[wasm_bindgen]
pub struct VizijDynParent {
    scene: Scene,
    cfg: Config,
    baker: VisualKeyingBake,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn report_to_js(op: &str, report: CommandReport) -> Result<JsValue, JsError> {
    swb::to_value(&report).map_err(|e| JsError::new(&format!("{op} report error: {e}")))
}

#[wasm_bindgen]
impl VizijDynParent {
    /// Create an empty scene. Pass a JSON config object or undefined/null for defaults.
    /// Example:
    ///   new VizijDynParent({ tag_prefix: "DP_", interpolation: "linear" })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<VizijDynParent, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };

        Ok(VizijDynParent {
            scene: Scene::new(),
            cfg,
            baker: VisualKeyingBake::new(),
        })
    }

    /// Replace the scene with a scene document (JS object) and apply its animation.
    #[wasm_bindgen(js_name = load_scene)]
    pub fn load_scene(&mut self, scene_json: JsValue) -> Result<(), JsError> {
        if jsvalue_is_undefined_or_null(&scene_json) {
            return Err(JsError::new("load_scene: scene_json is null/undefined"));
        }
        let s = JSON::stringify(&scene_json)
            .map_err(|e| JsError::new(&format!("load_scene stringify error: {:?}", e)))?
            .as_string()
            .ok_or_else(|| JsError::new("load_scene: stringify produced non-string"))?;
        self.scene =
            Scene::from_json(&s).map_err(|e| JsError::new(&format!("load_scene error: {e}")))?;
        Ok(())
    }

    /// Current scene document, including keyed actions and constraint stacks.
    #[wasm_bindgen]
    pub fn scene(&self) -> Result<JsValue, JsError> {
        let s = self
            .scene
            .to_json()
            .map_err(|e| JsError::new(&format!("scene error: {e}")))?;
        JSON::parse(&s).map_err(|e| JsError::new(&format!("scene parse error: {:?}", e)))
    }

    /// Move to `frame` and re-read animated properties.
    #[wasm_bindgen(js_name = set_frame)]
    pub fn set_frame(&mut self, frame: i32) {
        self.scene.set_frame(frame);
    }

    /// Set selection (`{ active, selected }`) and, optionally, the interaction
    /// mode ("object" | "pose" | "edit").
    #[wasm_bindgen(js_name = set_selection)]
    pub fn set_selection(&mut self, selection: JsValue, mode: JsValue) -> Result<(), JsError> {
        let selection: Selection = swb::from_value(selection)
            .map_err(|e| JsError::new(&format!("selection error: {e}")))?;
        if !jsvalue_is_undefined_or_null(&mode) {
            let mode: InteractionMode =
                swb::from_value(mode).map_err(|e| JsError::new(&format!("mode error: {e}")))?;
            self.scene.mode = mode;
        }
        self.scene.selection = selection;
        Ok(())
    }

    #[wasm_bindgen]
    pub fn create(&mut self) -> Result<JsValue, JsError> {
        let report = create(&mut self.scene, &self.cfg).map_err(|e| JsError::new(&e.to_string()))?;
        report_to_js("create", report)
    }

    #[wasm_bindgen]
    pub fn disable(&mut self) -> Result<JsValue, JsError> {
        let report =
            disable(&mut self.scene, &self.cfg).map_err(|e| JsError::new(&e.to_string()))?;
        report_to_js("disable", report)
    }

    #[wasm_bindgen]
    pub fn clear(&mut self) -> Result<JsValue, JsError> {
        let report = clear(&mut self.scene, &self.cfg).map_err(|e| JsError::new(&e.to_string()))?;
        report_to_js("clear", report)
    }

    #[wasm_bindgen(js_name = bake_and_clear)]
    pub fn bake_and_clear(&mut self) -> Result<JsValue, JsError> {
        let report = bake_and_clear(&mut self.scene, &self.cfg, &mut self.baker)
            .map_err(|e| JsError::new(&e.to_string()))?;
        report_to_js("bake_and_clear", report)
    }

    /// Evaluated world matrix of a subject (`{ kind: "object", object }` or
    /// `{ kind: "bone", armature, bone }`), column-major.
    #[wasm_bindgen(js_name = world_matrix)]
    pub fn world_matrix(&self, subject: JsValue) -> Result<Vec<f32>, JsError> {
        let subject: Subject =
            swb::from_value(subject).map_err(|e| JsError::new(&format!("subject error: {e}")))?;
        let m = self
            .scene
            .world_matrix(&subject)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(to_cols_array(&m).to_vec())
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
