//! 配置校验模块
//!
//! 校验规则：
//! - 四项凭据齐全且非空
//! - topic 非空
//! - 至少一个非空白的过滤词
//! - relay.capacity > 0
//! - 毫秒类配置为整数
//! - stream.source 取值合法，且其必填项齐全

use contracts::{
    ContractError, Settings, StreamSourceKind, DRAIN_TIMEOUT_KEY, RELAY_CAPACITY_KEY,
    SINK_QUEUE_TIMEOUT_KEY, STREAM_CONNECT_TIMEOUT_KEY, STREAM_HOST_KEY, STREAM_REPLAY_PATH_KEY, TERMS_KEY, TOPIC_KEY,
};

/// 校验解析后的配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(settings: &Settings) -> Result<(), ContractError> {
    validate_credentials(settings)?;
    validate_topic(settings)?;
    validate_terms(settings)?;
    validate_relay(settings)?;
    validate_timeouts(settings)?;
    validate_stream_source(settings)?;
    Ok(())
}

/// 凭据最先校验，缺失时先报认证错误
fn validate_credentials(settings: &Settings) -> Result<(), ContractError> {
    settings.credentials().map(|_| ())
}

fn validate_topic(settings: &Settings) -> Result<(), ContractError> {
    if settings.topic().trim().is_empty() {
        return Err(ContractError::config_validation(
            TOPIC_KEY,
            "topic cannot be empty",
        ));
    }
    Ok(())
}

fn validate_terms(settings: &Settings) -> Result<(), ContractError> {
    if settings.filter_terms().is_blank() {
        return Err(ContractError::config_validation(
            TERMS_KEY,
            "at least one non-empty term is required",
        ));
    }
    Ok(())
}

fn validate_relay(settings: &Settings) -> Result<(), ContractError> {
    if settings.relay_capacity()? == 0 {
        return Err(ContractError::config_validation(
            RELAY_CAPACITY_KEY,
            "relay.capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_timeouts(settings: &Settings) -> Result<(), ContractError> {
    for key in [
        DRAIN_TIMEOUT_KEY,
        SINK_QUEUE_TIMEOUT_KEY,
        STREAM_CONNECT_TIMEOUT_KEY,
    ] {
        settings.millis(key)?;
    }
    Ok(())
}

fn validate_stream_source(settings: &Settings) -> Result<(), ContractError> {
    let required = match settings.stream_source()? {
        StreamSourceKind::Tcp => STREAM_HOST_KEY,
        StreamSourceKind::Replay => STREAM_REPLAY_PATH_KEY,
    };
    match settings.get(required) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ContractError::config_validation(
            required,
            "required by the selected stream.source",
        )),
    }
}
