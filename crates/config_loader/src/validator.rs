//! 配置校验模块
//!
//! 校验规则：
//! - fps > 0, tick_timeout_ms > 0
//! - camera id / channel 唯一，channel 不得与遥测数据集同名
//! - 相机分辨率 > 0，且所有相机尺寸一致 (录制数据集共享同一形状)
//! - initial_capacity >= 1

use std::collections::HashSet;

use contracts::{ContractError, SessionBlueprint, TELEMETRY_FIELDS};

/// 校验 SessionBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_world(blueprint)?;
    validate_camera_ids(blueprint)?;
    validate_camera_sizes(blueprint)?;
    validate_recorder(blueprint)?;
    Ok(())
}

/// 校验步长与超时
fn validate_world(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let world = &blueprint.world;
    if world.fps <= 0.0 || !world.fps.is_finite() {
        return Err(ContractError::config_validation(
            "world.fps",
            format!("fps must be a finite value > 0, got {}", world.fps),
        ));
    }
    if world.tick_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "world.tick_timeout_ms",
            "tick_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验相机 id 与 channel 唯一性
///
/// channel 即图像数据集名称，与遥测数据集共用一个命名空间。
fn validate_camera_ids(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut ids = HashSet::new();
    let mut channels = HashSet::new();
    for camera in &blueprint.cameras {
        if !ids.insert(&camera.id) {
            return Err(ContractError::config_validation(
                format!("cameras[id={}]", camera.id),
                "duplicate camera id",
            ));
        }
        if !channels.insert(&camera.channel) {
            return Err(ContractError::config_validation(
                format!("cameras[{}].channel", camera.id),
                format!("duplicate channel '{}'", camera.channel),
            ));
        }
        if TELEMETRY_FIELDS.iter().any(|f| f.name == camera.channel) {
            return Err(ContractError::config_validation(
                format!("cameras[{}].channel", camera.id),
                format!("channel '{}' clashes with a telemetry dataset", camera.channel),
            ));
        }
    }
    Ok(())
}

/// 校验相机分辨率
fn validate_camera_sizes(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let Some(first) = blueprint.cameras.first() else {
        return Ok(());
    };

    for camera in &blueprint.cameras {
        if camera.width == 0 || camera.height == 0 {
            return Err(ContractError::config_validation(
                format!("cameras[{}]", camera.id),
                format!(
                    "resolution must be non-zero, got {}x{}",
                    camera.width, camera.height
                ),
            ));
        }
        if (camera.width, camera.height) != (first.width, first.height) {
            return Err(ContractError::config_validation(
                format!("cameras[{}]", camera.id),
                format!(
                    "all cameras must share one resolution: {}x{} vs {}x{}",
                    camera.width, camera.height, first.width, first.height
                ),
            ));
        }
    }
    Ok(())
}

/// 校验录制设置
fn validate_recorder(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if blueprint.recorder.initial_capacity == 0 {
        return Err(ContractError::config_validation(
            "recorder.initial_capacity",
            "initial_capacity must be >= 1",
        ));
    }
    Ok(())
}
