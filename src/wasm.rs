use wasm_bindgen::prelude::*;

use crate::{codec, protocol::LineTiming, Config, IMAGE_HEIGHT, IMAGE_WIDTH};

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct Robot36Wasm {
    config: Config,
}

#[wasm_bindgen]
impl Robot36Wasm {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();

        Self {
            config: Config::default(),
        }
    }

    #[wasm_bindgen]
    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, 1.0);
    }

    #[wasm_bindgen]
    pub fn set_sync_threshold(&mut self, threshold: f32) {
        self.config.sync_threshold = threshold;
    }

    /// Packed 320x240 RGB → WAV bytes.
    #[wasm_bindgen]
    pub fn encode(&self, rgb: &[u8]) -> Result<Vec<u8>, JsValue> {
        codec::encode_rgb(rgb, IMAGE_WIDTH, IMAGE_HEIGHT, &self.config).map_err(to_js)
    }

    /// Any supported image file → WAV bytes.
    #[wasm_bindgen]
    pub fn encode_image(&self, image: &[u8]) -> Result<Vec<u8>, JsValue> {
        codec::encode_image(image, &self.config).map_err(to_js)
    }

    /// WAV bytes → 320x240 luma bytes.
    #[wasm_bindgen]
    pub fn decode(&self, wav: &[u8]) -> Result<Vec<u8>, JsValue> {
        codec::decode_wav(wav, &self.config)
            .map(|decoded| decoded.frame.pixels)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn decode_to_png(&self, wav: &[u8]) -> Result<Vec<u8>, JsValue> {
        codec::decode_wav(wav, &self.config)
            .and_then(|decoded| decoded.to_png())
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn get_width(&self) -> u32 {
        IMAGE_WIDTH as u32
    }

    #[wasm_bindgen]
    pub fn get_height(&self) -> u32 {
        IMAGE_HEIGHT as u32
    }

    #[wasm_bindgen]
    pub fn get_sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    #[wasm_bindgen]
    pub fn get_line_samples(&self) -> u32 {
        LineTiming::new(self.config.sample_rate).line as u32
    }
}

impl Default for Robot36Wasm {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
}
