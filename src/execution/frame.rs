//! Call frames.

use crate::{
    execution::Value,
    typesystem::{FrameLayout, MethodId, ModuleId, VarDesc},
    Error::OutOfBounds,
    Result,
};

/// The storage of one active bytecode call.
///
/// The scratch buffer holds the arguments followed by the locals, sliced by the method's
/// [`FrameLayout`]. It is zero filled on entry, so locals start out as `0`, `0.0` or `null`.
pub(crate) struct Frame<'a> {
    pub(crate) method: MethodId,
    pub(crate) module: ModuleId,
    layout: &'a FrameLayout,
    storage: Vec<u8>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(method: MethodId, module: ModuleId, layout: &'a FrameLayout) -> Self {
        Frame {
            method,
            module,
            layout,
            storage: vec![0; layout.frame_size()],
        }
    }

    pub(crate) fn arg(&self, index: u16) -> Result<Value> {
        self.load(self.layout.arg(index)?)
    }

    pub(crate) fn set_arg(&mut self, index: u16, value: &Value) -> Result<()> {
        let var = *self.layout.arg(index)?;
        self.store(&var, value)
    }

    pub(crate) fn local(&self, index: u16) -> Result<Value> {
        self.load(self.layout.local(index)?)
    }

    pub(crate) fn set_local(&mut self, index: u16, value: &Value) -> Result<()> {
        let var = *self.layout.local(index)?;
        self.store(&var, value)
    }

    pub(crate) fn arg_count(&self) -> usize {
        self.layout.args.len()
    }

    fn load(&self, var: &VarDesc) -> Result<Value> {
        let bytes = self.storage.get(var.range()).ok_or(OutOfBounds)?;
        Value::load(&var.ty, bytes)
    }

    fn store(&mut self, var: &VarDesc, value: &Value) -> Result<()> {
        let bytes = self.storage.get_mut(var.range()).ok_or(OutOfBounds)?;
        value.store(&var.ty, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::{ElementType, TypeDesc};

    fn var(offset: usize, size: usize, element: ElementType) -> VarDesc {
        VarDesc {
            offset,
            size,
            ty: TypeDesc::primitive(element),
        }
    }

    #[test]
    fn args_and_locals() {
        let layout = FrameLayout {
            args: vec![var(0, 1, ElementType::Boolean), var(8, 8, ElementType::R8)],
            locals: vec![var(16, 2, ElementType::I2)],
            return_type: None,
            params_size: 16,
            locals_size: 8,
        };
        let mut frame = Frame::new(MethodId::new(0), ModuleId::new(0), &layout);
        assert_eq!(frame.arg_count(), 2);

        assert_eq!(frame.local(0).unwrap(), Value::I32(0));
        frame.set_local(0, &Value::I32(-2)).unwrap();
        assert_eq!(frame.local(0).unwrap(), Value::I32(-2));

        frame.set_arg(0, &Value::I32(1)).unwrap();
        frame.set_arg(1, &Value::F64(0.5)).unwrap();
        assert_eq!(frame.arg(0).unwrap(), Value::I32(1));
        assert_eq!(frame.arg(1).unwrap(), Value::F64(0.5));

        assert!(frame.arg(2).is_err());
        assert!(frame.set_local(1, &Value::I32(0)).is_err());
        assert!(frame.set_arg(1, &Value::NULL).is_err());
    }
}
