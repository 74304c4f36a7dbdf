pub mod ken_burns;
pub mod overlay_anim;
pub mod transitions;
